//! Upsert-by-id tracking of image-generation subtasks.
//!
//! Progress events for the same task may arrive duplicated or out of order;
//! every field is last-write-wins. Status lines are emitted only when a
//! task's progress bucket changes, which bounds the noise to at most five
//! ordinary lines per task plus one terminal line.

use std::collections::BTreeMap;
use weft_types::{extract_asset_id, ImageTask, ImageTaskStatus};

#[derive(Debug, Default, Clone)]
pub struct ImageTaskTracker {
    tasks: BTreeMap<u32, ImageTask>,
    buckets: BTreeMap<u32, String>,
}

impl ImageTaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create queued tasks for a batch tool call. Ids without a matching
    /// prompt get an empty one. Registering an id a second time only fills
    /// in the prompt; progress already applied is kept.
    pub fn register_batch(&mut self, task_ids: &[u32], prompts: &[String]) {
        for (index, &id) in task_ids.iter().enumerate() {
            let task = self.tasks.entry(id).or_insert_with(|| ImageTask {
                id,
                ..ImageTask::default()
            });
            if let Some(prompt) = prompts.get(index) {
                task.prompt = prompt.clone();
            }
        }
    }

    /// Apply one `image_progress` event. Returns a human-readable status
    /// line when the task's bucket changed, `None` otherwise.
    pub fn apply_progress(
        &mut self,
        task_id: u32,
        status: &str,
        progress: Option<f64>,
        url: Option<&str>,
        error_message: Option<&str>,
    ) -> Option<String> {
        let task = self.tasks.entry(task_id).or_insert_with(|| ImageTask {
            id: task_id,
            ..ImageTask::default()
        });

        task.status = ImageTaskStatus::from_wire(status);
        if let Some(url) = url {
            if let Some(asset_id) = extract_asset_id(url) {
                task.asset_id = Some(asset_id);
            }
        }
        if let Some(message) = error_message {
            task.error_message = Some(message.to_string());
        }

        let percent = (progress.unwrap_or(0.0).clamp(0.0, 1.0) * 100.0) as u32;
        let bucket = match task.status {
            ImageTaskStatus::Generating => format!("generating:{}", percent / 20 * 20),
            ImageTaskStatus::Queued => "queued".to_string(),
            ImageTaskStatus::Done => "done".to_string(),
            ImageTaskStatus::Failed => "failed".to_string(),
        };

        // Unseen tasks are treated as already at the zero bucket, so the
        // first sub-20% generating event does not produce a line.
        let previous = self
            .buckets
            .insert(task_id, bucket.clone())
            .unwrap_or_else(|| "generating:0".to_string());
        if previous == bucket {
            return None;
        }

        tracing::debug!(task_id, %bucket, "image task bucket changed");
        Some(match task.status {
            ImageTaskStatus::Queued => format!("Image task {task_id} queued"),
            ImageTaskStatus::Generating => {
                format!("Image task {task_id} generating, {percent}% done")
            }
            ImageTaskStatus::Done => format!("Image task {task_id} finished"),
            ImageTaskStatus::Failed => match &task.error_message {
                Some(reason) => format!("Image task {task_id} failed: {reason}"),
                None => format!("Image task {task_id} failed"),
            },
        })
    }

    /// Bulk terminal reconciliation from `workflow_complete`: pair the
    /// ordered asset ids with the tasks in id order and force every
    /// non-terminal task to `done`, regardless of missed progress events.
    pub fn reconcile_complete(&mut self, asset_ids: &[i64]) {
        for (task, asset_id) in self.tasks.values_mut().zip(asset_ids) {
            if !task.status.is_terminal() {
                task.status = ImageTaskStatus::Done;
            }
            if task.asset_id.is_none() {
                task.asset_id = Some(*asset_id);
            }
        }
        for task in self.tasks.values_mut().skip(asset_ids.len()) {
            if !task.status.is_terminal() {
                task.status = ImageTaskStatus::Done;
            }
        }
    }

    pub fn get(&self, task_id: u32) -> Option<&ImageTask> {
        self.tasks.get(&task_id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &ImageTask> {
        self.tasks.values()
    }

    pub fn to_vec(&self) -> Vec<ImageTask> {
        self.tasks.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn all_done(&self) -> bool {
        !self.tasks.is_empty()
            && self
                .tasks
                .values()
                .all(|task| task.status == ImageTaskStatus::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_batch_creates_queued_tasks() {
        let mut tracker = ImageTaskTracker::new();
        tracker.register_batch(&[1, 2], &["a cat".to_string(), "a dog".to_string()]);
        assert_eq!(tracker.to_vec().len(), 2);
        let task = tracker.get(1).unwrap();
        assert_eq!(task.prompt, "a cat");
        assert_eq!(task.status, ImageTaskStatus::Queued);
    }

    #[test]
    fn test_bucket_change_emits_exactly_two_lines() {
        let mut tracker = ImageTaskTracker::new();
        let lines: Vec<Option<String>> = [0.05, 0.22, 0.24, 0.41]
            .iter()
            .map(|p| tracker.apply_progress(3, "generating", Some(*p), None, None))
            .collect();
        let emitted: Vec<&String> = lines.iter().flatten().collect();
        // Lines carry the raw percent; only the bucket change gates them.
        assert_eq!(emitted.len(), 2);
        assert!(emitted[0].contains("22%"));
        assert!(emitted[1].contains("41%"));
    }

    #[test]
    fn test_duplicate_progress_emits_nothing() {
        let mut tracker = ImageTaskTracker::new();
        assert!(tracker
            .apply_progress(1, "generating", Some(0.55), None, None)
            .is_some());
        assert!(tracker
            .apply_progress(1, "generating", Some(0.55), None, None)
            .is_none());
    }

    #[test]
    fn test_terminal_status_line_and_asset_id_from_url() {
        let mut tracker = ImageTaskTracker::new();
        let line = tracker.apply_progress(7, "complete", Some(1.0), Some("/api/assets/90210"), None);
        assert_eq!(line.as_deref(), Some("Image task 7 finished"));
        let task = tracker.get(7).unwrap();
        assert_eq!(task.status, ImageTaskStatus::Done);
        assert_eq!(task.asset_id, Some(90210));
    }

    #[test]
    fn test_reconcile_complete_overrides_stale_states() {
        let mut tracker = ImageTaskTracker::new();
        tracker.register_batch(&[1, 2, 3], &[]);
        tracker.apply_progress(1, "generating", Some(0.5), None, None);
        tracker.apply_progress(2, "failed", None, None, Some("safety"));
        tracker.reconcile_complete(&[11, 22, 33]);

        assert_eq!(tracker.get(1).unwrap().status, ImageTaskStatus::Done);
        assert_eq!(tracker.get(1).unwrap().asset_id, Some(11));
        // Failed is terminal and must not be overridden.
        assert_eq!(tracker.get(2).unwrap().status, ImageTaskStatus::Failed);
        assert_eq!(tracker.get(3).unwrap().status, ImageTaskStatus::Done);
        assert_eq!(tracker.get(3).unwrap().asset_id, Some(33));
    }

    #[test]
    fn test_failed_line_includes_reason() {
        let mut tracker = ImageTaskTracker::new();
        let line = tracker.apply_progress(4, "failed", None, None, Some("nsfw filter"));
        assert_eq!(line.as_deref(), Some("Image task 4 failed: nsfw filter"));
    }
}
