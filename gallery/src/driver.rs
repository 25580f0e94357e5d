use crate::measure::read_dimensions;
use crate::source::MediaSource;
use crate::state::{Command, Gallery, Message};
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use store::KeyValueStore;

/// Thumbnails fetched in parallel when measuring dimensions.
const MEASURE_CONCURRENCY: usize = 4;

/// Runs [`Command`]s against a [`MediaSource`] and feeds the outcomes back
/// into the gallery until nothing is left to do.
pub struct Driver<M: MediaSource> {
    source: Arc<M>,
}

impl<M: MediaSource> Clone for Driver<M> {
    fn clone(&self) -> Self {
        Driver {
            source: Arc::clone(&self.source),
        }
    }
}

impl<M: MediaSource> Driver<M> {
    pub fn new(source: M) -> Self {
        Driver {
            source: Arc::new(source),
        }
    }

    pub fn source(&self) -> &M {
        &self.source
    }

    /// Apply `message` and run everything it triggers.
    pub async fn dispatch<S: KeyValueStore>(&self, gallery: &mut Gallery<S>, message: Message) {
        let command = gallery.update(message);
        self.run(gallery, command).await;
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, gallery)))]
    pub async fn run<S: KeyValueStore>(&self, gallery: &mut Gallery<S>, command: Command) {
        let mut queue = VecDeque::from([command]);
        while let Some(command) = queue.pop_front() {
            match command {
                Command::None => {}
                Command::Batch(commands) => queue.extend(commands),
                Command::FetchPage {
                    generation,
                    page_token,
                } => {
                    let result = self
                        .source
                        .fetch_page(page_token.as_deref())
                        .await
                        .map_err(|e| e.to_string());
                    queue.push_back(gallery.update(Message::PageLoaded { generation, result }));
                }
                Command::MeasureDimensions(ids) => {
                    for message in self.measure(ids).await {
                        queue.push_back(gallery.update(message));
                    }
                }
            }
        }
    }

    async fn measure(&self, ids: Vec<String>) -> Vec<Message> {
        stream::iter(ids)
            .map(|id| {
                let source = Arc::clone(&self.source);
                async move {
                    let measured = match source.fetch_thumbnail(&id).await {
                        Ok(bytes) => read_dimensions(&bytes),
                        Err(e) => Err(e),
                    };
                    match measured {
                        Ok((w, h)) => Message::DimensionsMeasured(id, w, h),
                        Err(e) => {
                            tracing::debug!(file_id = %id, error = %e, "Measuring thumbnail failed");
                            Message::MeasureFailed(id)
                        }
                    }
                }
            })
            .buffer_unordered(MEASURE_CONCURRENCY)
            .collect()
            .await
    }
}
