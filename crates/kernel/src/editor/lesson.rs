//! Lesson and course editing.
//!
//! A `LessonBuilder` is a `ContentBuilder` for one lesson page whose every
//! document change schedules a debounced save. A `CourseBuilder` keeps the
//! open lessons of one course and gives each its own autosave.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tessera_sdk::Block;
use tracing::{debug, info};

use crate::config::Config;
use crate::content::{BlockTypeRegistry, LoadReport};
use crate::editor::autosave::{Autosave, Persist, SaveStatus};
use crate::editor::builder::ContentBuilder;

/// Host-side lesson storage.
#[async_trait]
pub trait LessonStore: Send + Sync + 'static {
    async fn save_lesson(&self, lesson_id: &str, blocks: Vec<Block>) -> anyhow::Result<()>;
}

/// Persist adapter that saves one lesson through a `LessonStore`.
struct LessonPersist {
    store: Arc<dyn LessonStore>,
    lesson_id: String,
}

#[async_trait]
impl Persist for LessonPersist {
    async fn persist(&self, blocks: Vec<Block>) -> anyhow::Result<()> {
        self.store
            .save_lesson(&self.lesson_id, blocks)
            .await
            .with_context(|| format!("saving lesson '{}'", self.lesson_id))
    }
}

/// Editor for one lesson page with debounced autosave.
#[derive(Debug)]
pub struct LessonBuilder {
    lesson_id: String,
    builder: ContentBuilder,
    autosave: Autosave,
}

impl LessonBuilder {
    /// Wire `builder`'s document changes to `autosave`.
    ///
    /// Load the lesson content into the builder first; only changes made
    /// after this call are saved.
    pub fn new(lesson_id: impl Into<String>, mut builder: ContentBuilder, autosave: Autosave) -> Self {
        let handle = autosave.clone();
        builder.subscribe(move |blocks| handle.schedule(blocks.to_vec()));
        Self {
            lesson_id: lesson_id.into(),
            builder,
            autosave,
        }
    }

    pub fn lesson_id(&self) -> &str {
        &self.lesson_id
    }

    pub fn builder(&self) -> &ContentBuilder {
        &self.builder
    }

    /// Mutations made through this builder are autosaved.
    pub fn builder_mut(&mut self) -> &mut ContentBuilder {
        &mut self.builder
    }

    pub fn autosave(&self) -> &Autosave {
        &self.autosave
    }

    pub fn save_status(&self) -> SaveStatus {
        self.autosave.current_status()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.autosave.has_unsaved_changes()
    }

    /// Save any pending changes now.
    pub async fn flush(&self) -> anyhow::Result<()> {
        self.autosave.flush().await
    }

    /// Flush and hand back the final document.
    ///
    /// On failure the lesson comes back inside the error, edits intact.
    pub async fn close(self) -> Result<Vec<Block>, LessonCloseError> {
        match self.autosave.flush().await {
            Ok(()) => Ok(self.builder.serialize()),
            Err(error) => Err(LessonCloseError {
                lesson: Box::new(self),
                error,
            }),
        }
    }
}

/// A lesson whose final flush failed.
#[derive(Debug, thiserror::Error)]
#[error("closing lesson '{}': {error:#}", .lesson.lesson_id)]
pub struct LessonCloseError {
    /// The still-open lesson; nothing was discarded.
    pub lesson: Box<LessonBuilder>,
    pub error: anyhow::Error,
}

/// The open lessons of one course.
pub struct CourseBuilder {
    course_id: String,
    registry: BlockTypeRegistry,
    store: Arc<dyn LessonStore>,
    config: Config,
    /// Open lessons in opening order.
    lessons: Vec<LessonBuilder>,
}

impl std::fmt::Debug for CourseBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CourseBuilder")
            .field("course_id", &self.course_id)
            .field("lessons", &self.lesson_ids())
            .finish_non_exhaustive()
    }
}

impl CourseBuilder {
    pub fn new(
        course_id: impl Into<String>,
        registry: BlockTypeRegistry,
        store: Arc<dyn LessonStore>,
        config: Config,
    ) -> Self {
        Self {
            course_id: course_id.into(),
            registry,
            store,
            config,
            lessons: Vec::new(),
        }
    }

    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    /// Open a lesson with its stored content.
    ///
    /// An already open lesson is returned unchanged with an empty report.
    pub fn open_lesson(
        &mut self,
        lesson_id: &str,
        blocks: Vec<Block>,
    ) -> (&mut LessonBuilder, LoadReport) {
        if let Some(index) = self.position(lesson_id) {
            return (&mut self.lessons[index], LoadReport::default());
        }

        let mut builder =
            ContentBuilder::new(self.registry.clone()).with_drag_throttle(self.config.drag_throttle);
        let report = builder.load(blocks);
        let persist = Arc::new(LessonPersist {
            store: self.store.clone(),
            lesson_id: lesson_id.to_string(),
        });
        let autosave = Autosave::new(persist, self.config.autosave_delay);
        info!(course_id = %self.course_id, lesson_id, blocks = report.loaded, "lesson opened");

        self.lessons
            .push(LessonBuilder::new(lesson_id, builder, autosave));
        let index = self.lessons.len() - 1;
        (&mut self.lessons[index], report)
    }

    pub fn lesson(&self, lesson_id: &str) -> Option<&LessonBuilder> {
        self.lessons.iter().find(|l| l.lesson_id == lesson_id)
    }

    pub fn lesson_mut(&mut self, lesson_id: &str) -> Option<&mut LessonBuilder> {
        self.lessons.iter_mut().find(|l| l.lesson_id == lesson_id)
    }

    /// Open lesson ids in opening order.
    pub fn lesson_ids(&self) -> Vec<&str> {
        self.lessons.iter().map(|l| l.lesson_id.as_str()).collect()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.lessons.iter().any(LessonBuilder::has_unsaved_changes)
    }

    /// Close one lesson, flushing its changes. Returns its final document,
    /// or `None` if it was not open. A lesson whose flush fails stays open.
    pub async fn close_lesson(&mut self, lesson_id: &str) -> anyhow::Result<Option<Vec<Block>>> {
        let Some(index) = self.position(lesson_id) else {
            return Ok(None);
        };
        debug!(course_id = %self.course_id, lesson_id, "closing lesson");
        self.lessons[index]
            .flush()
            .await
            .with_context(|| format!("closing lesson '{lesson_id}'"))?;
        let lesson = self.lessons.remove(index);
        Ok(Some(lesson.builder.serialize()))
    }

    /// Flush every open lesson, keeping them open. Reports the first failure
    /// after trying all of them.
    pub async fn flush_all(&self) -> anyhow::Result<()> {
        let mut first_error = None;
        for lesson in &self.lessons {
            if let Err(e) = lesson.flush().await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e).with_context(|| format!("flushing course '{}'", self.course_id)),
            None => Ok(()),
        }
    }

    fn position(&self, lesson_id: &str) -> Option<usize> {
        self.lessons.iter().position(|l| l.lesson_id == lesson_id)
    }
}
