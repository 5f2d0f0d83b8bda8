#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Everything here drives the real kernel types; the only stand-in is the
//! in-memory lesson store behind autosave.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tessera_kernel::Config;
use tessera_kernel::content::BlockTypeRegistry;
use tessera_kernel::editor::{BoundingBox, ContentBuilder, LessonStore, Sibling};
use tessera_sdk::{Block, BlockId, RowId};

/// Row height used for every laid-out list in these tests.
pub const ROW_HEIGHT: f64 = 10.0;

/// A builder over the standard types with drag throttling disabled.
pub fn builder() -> ContentBuilder {
    ContentBuilder::new(BlockTypeRegistry::with_standard_types()).with_drag_throttle(Duration::ZERO)
}

/// Config with a short autosave delay and no drag throttle.
pub fn test_config() -> Config {
    Config {
        autosave_delay: Duration::from_millis(200),
        drag_throttle: Duration::ZERO,
    }
}

/// Vertical layout: item `i` spans `[i * ROW_HEIGHT, (i + 1) * ROW_HEIGHT)`.
pub fn stacked<Id: Clone>(ids: &[Id]) -> Vec<Sibling<Id>> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            Sibling::new(
                id.clone(),
                BoundingBox::new(0.0, i as f64 * ROW_HEIGHT, 100.0, ROW_HEIGHT),
            )
        })
        .collect()
}

/// Horizontal layout: item `i` spans `[i * 50, (i + 1) * 50)`.
pub fn side_by_side<Id: Clone>(ids: &[Id]) -> Vec<Sibling<Id>> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| Sibling::new(id.clone(), BoundingBox::new(i as f64 * 50.0, 0.0, 50.0, 20.0)))
        .collect()
}

pub fn block_ids(ids: &[&str]) -> Vec<BlockId> {
    ids.iter().map(|id| BlockId::new(*id)).collect()
}

pub fn row_ids(ids: &[&str]) -> Vec<RowId> {
    ids.iter().map(|id| RowId::new(*id)).collect()
}

/// In-memory lesson store recording every save.
#[derive(Default)]
pub struct RecordingStore {
    pub saves: Mutex<Vec<(String, Vec<Block>)>>,
    pub fail: AtomicBool,
    /// Lessons whose saves always fail.
    pub failing_lessons: Mutex<HashSet<String>>,
    /// How long each save takes.
    pub latency: Mutex<Duration>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().len()
    }

    /// Most recent saved document per lesson.
    pub fn latest(&self) -> HashMap<String, Vec<Block>> {
        self.saves.lock().iter().cloned().collect()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lesson(&self, lesson_id: &str) {
        self.failing_lessons.lock().insert(lesson_id.to_string());
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }
}

#[async_trait]
impl LessonStore for RecordingStore {
    async fn save_lesson(&self, lesson_id: &str, blocks: Vec<Block>) -> anyhow::Result<()> {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.fail.load(Ordering::SeqCst) || self.failing_lessons.lock().contains(lesson_id) {
            anyhow::bail!("lesson endpoint unavailable");
        }
        self.saves.lock().push((lesson_id.to_string(), blocks));
        Ok(())
    }
}
