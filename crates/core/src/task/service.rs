//! Task service
//!
//! One unit of work per call. Lookups that miss come back as `None` (or
//! `false` for deletes) instead of an error, and no change is staged for a
//! task that does not exist.

use tracing::info;
use uuid::Uuid;

use super::model::{NewTask, Task, TaskChanges};
use super::query::TaskQuery;
use super::repository::TaskRepository;
use crate::db::Database;
use crate::Result;

#[derive(Clone)]
pub struct TaskService {
    db: Database,
}

impl TaskService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn list_tasks(&self, query: TaskQuery) -> Result<Vec<Task>> {
        let tasks = self
            .db
            .unit_of_work(move |repos| repos.tasks.list(&query))
            .await?;
        info!("Fetched {} tasks", tasks.len());
        Ok(tasks)
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        self.db
            .unit_of_work(move |repos| repos.tasks.get_by_id(id))
            .await
    }

    pub async fn create_task(&self, new_task: NewTask) -> Result<Task> {
        new_task.validate()?;
        let task = self
            .db
            .unit_of_work(move |repos| repos.tasks.create(new_task))
            .await?;
        info!("Created task {} - {}", task.id, task.title);
        Ok(task)
    }

    pub async fn update_task(&self, id: Uuid, changes: TaskChanges) -> Result<Option<Task>> {
        changes.validate()?;
        let updated = self
            .db
            .unit_of_work(move |repos| match repos.tasks.get_by_id(id)? {
                Some(task) => repos.tasks.update(task, changes).map(Some),
                None => Ok(None),
            })
            .await?;
        if updated.is_some() {
            info!("Updated task {}", id);
        }
        Ok(updated)
    }

    /// Returns `false` when there was nothing to delete
    pub async fn delete_task(&self, id: Uuid) -> Result<bool> {
        let deleted = self
            .db
            .unit_of_work(move |repos| match repos.tasks.get_by_id(id)? {
                Some(task) => repos.tasks.delete(&task).map(|()| true),
                None => Ok(false),
            })
            .await?;
        if deleted {
            info!("Deleted task {}", id);
        }
        Ok(deleted)
    }

    pub async fn mark_done(&self, id: Uuid, done: bool) -> Result<Option<Task>> {
        let updated = self
            .db
            .unit_of_work(move |repos| match repos.tasks.get_by_id(id)? {
                Some(task) => repos.tasks.mark_done(task, done).map(Some),
                None => Ok(None),
            })
            .await?;
        if updated.is_some() {
            info!(
                "Task {} marked as {}",
                id,
                if done { "done" } else { "undone" }
            );
        }
        Ok(updated)
    }

    pub async fn update_priority(&self, id: Uuid, priority: i32) -> Result<Option<Task>> {
        let updated = self
            .db
            .unit_of_work(move |repos| match repos.tasks.get_by_id(id)? {
                Some(task) => repos.tasks.update_priority(task, priority).map(Some),
                None => Ok(None),
            })
            .await?;
        if updated.is_some() {
            info!("Task {} priority updated to {}", id, priority);
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseSettings;
    use crate::task::{StatusFilter, TaskSort};
    use crate::Error;
    use tempfile::TempDir;

    fn create_test_service() -> (TaskService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(&DatabaseSettings {
            path: temp_dir.path().join("tasks.db"),
            max_connections: 4,
        })
        .unwrap();
        (TaskService::new(db), temp_dir)
    }

    #[tokio::test]
    async fn test_create_and_get_task() {
        let (service, _temp) = create_test_service();

        let created = service
            .create_task(NewTask::new("Buy milk").with_priority(5))
            .await
            .unwrap();
        assert!(!created.done);

        let fetched = service.get_task(created.id).await.unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let (service, _temp) = create_test_service();

        let err = service.create_task(NewTask::new("")).await.unwrap_err();
        assert!(err.is_client_error());

        let tasks = service.list_tasks(TaskQuery::default()).await.unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_missing_task_returns_sentinel() {
        let (service, _temp) = create_test_service();
        let id = Uuid::new_v4();

        assert!(service.get_task(id).await.unwrap().is_none());
        assert!(service
            .update_task(
                id,
                TaskChanges {
                    title: Some("x".to_string()),
                    ..Default::default()
                }
            )
            .await
            .unwrap()
            .is_none());
        assert!(!service.delete_task(id).await.unwrap());
        assert!(service.mark_done(id, true).await.unwrap().is_none());
        assert!(service.update_priority(id, 1).await.unwrap().is_none());

        let tasks = service.list_tasks(TaskQuery::default()).await.unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_update_task_partial() {
        let (service, _temp) = create_test_service();
        let task = service
            .create_task(NewTask::new("Buy milk").with_description("Two litres"))
            .await
            .unwrap();

        let updated = service
            .update_task(
                task.id,
                TaskChanges {
                    done: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(updated.done);
        assert_eq!(updated.title, task.title);
        assert_eq!(updated.description, task.description);

        let unchanged = service
            .update_task(task.id, TaskChanges::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged, updated);
    }

    #[tokio::test]
    async fn test_update_task_validation_happens_before_lookup() {
        let (service, _temp) = create_test_service();

        let result = service
            .update_task(
                Uuid::new_v4(),
                TaskChanges {
                    title: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_mark_done_priority_and_delete() {
        let (service, _temp) = create_test_service();
        let task = service.create_task(NewTask::new("Buy milk")).await.unwrap();

        let task = service.mark_done(task.id, true).await.unwrap().unwrap();
        assert!(task.done);

        let task = service
            .update_priority(task.id, 1000)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.priority, 1000);

        assert!(service.delete_task(task.id).await.unwrap());
        assert!(service.get_task(task.id).await.unwrap().is_none());
        assert!(!service.delete_task(task.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_tasks_with_filters() {
        let (service, _temp) = create_test_service();
        for (title, done, priority) in [("a", true, 3), ("b", false, 1), ("c", true, 2)] {
            service
                .create_task(NewTask::new(title).with_done(done).with_priority(priority))
                .await
                .unwrap();
        }

        let done = service
            .list_tasks(
                TaskQuery::default()
                    .with_status(StatusFilter::Done)
                    .with_sort(TaskSort::PriorityAsc),
            )
            .await
            .unwrap();
        let titles: Vec<&str> = done.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_concurrent_updates_to_different_tasks() {
        let (service, _temp) = create_test_service();
        let mut ids = Vec::new();
        for i in 0..8 {
            let task = service
                .create_task(NewTask::new(format!("Task {}", i)))
                .await
                .unwrap();
            ids.push(task.id);
        }

        let handles: Vec<_> = ids
            .iter()
            .map(|&id| {
                let service = service.clone();
                tokio::spawn(async move { service.mark_done(id, true).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().unwrap().is_some());
        }

        let done = service
            .list_tasks(TaskQuery::default().with_status(StatusFilter::Done))
            .await
            .unwrap();
        assert_eq!(done.len(), ids.len());
    }
}
