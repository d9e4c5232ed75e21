//! Session-owned one-shot timers
//!
//! Delayed effects (spawner readiness, invincibility expiry) are scheduled
//! here instead of as free-running callbacks. The session polls the
//! scheduler at the start of each tick with its own clock, and every task
//! carries the session id that created it. A restart cancels everything and
//! bumps the session id, so nothing from an old session can fire into a new
//! one.

use serde::{Deserialize, Serialize};

use super::entity::EntityKind;

/// Handle for cancelling a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(u64);

/// What happens when a task fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerAction {
    /// A spawner's initial delay has elapsed
    SpawnerReady(EntityKind),
    /// Invincibility granted by a correct answer runs out
    InvincibilityExpired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScheduledTask {
    id: TaskId,
    session_id: u32,
    fire_at: f64,
    action: TimerAction,
}

/// Pending one-shot tasks keyed to the session clock
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` to fire at clock time `fire_at`
    pub fn schedule(&mut self, session_id: u32, fire_at: f64, action: TimerAction) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(ScheduledTask {
            id,
            session_id,
            fire_at,
            action,
        });
        id
    }

    /// Cancel a task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Drop every pending task
    pub fn cancel_all(&mut self) -> usize {
        let count = self.tasks.len();
        if count > 0 {
            log::debug!("Cancelled {} pending timers", count);
        }
        self.tasks.clear();
        count
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Remove and return every task due at `now`, in firing order
    ///
    /// Tasks tagged with a session other than `session_id` are discarded
    /// without firing.
    pub fn poll(&mut self, now: f64, session_id: u32) -> Vec<TimerAction> {
        let mut due = Vec::new();
        self.tasks.retain(|t| {
            if t.session_id != session_id {
                log::warn!(
                    "Discarding stale timer {:?} from session {} (current {})",
                    t.action,
                    t.session_id,
                    session_id
                );
                return false;
            }
            if t.fire_at <= now {
                due.push(t.clone());
                return false;
            }
            true
        });
        // Stable by id so equal deadlines fire in scheduling order
        due.sort_by(|a, b| a.fire_at.total_cmp(&b.fire_at).then(a.id.0.cmp(&b.id.0)));
        due.into_iter().map(|t| t.action).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_when_due() {
        let mut s = Scheduler::new();
        s.schedule(1, 2.0, TimerAction::InvincibilityExpired);
        assert!(s.poll(1.9, 1).is_empty());
        assert_eq!(s.poll(2.0, 1), vec![TimerAction::InvincibilityExpired]);
        assert!(s.poll(5.0, 1).is_empty());
        assert!(s.is_empty());
    }

    #[test]
    fn test_cancel() {
        let mut s = Scheduler::new();
        let id = s.schedule(1, 1.0, TimerAction::InvincibilityExpired);
        assert!(s.is_pending(id));
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(s.poll(10.0, 1).is_empty());
    }

    #[test]
    fn test_fires_in_deadline_order() {
        let mut s = Scheduler::new();
        s.schedule(1, 3.0, TimerAction::InvincibilityExpired);
        s.schedule(1, 1.0, TimerAction::SpawnerReady(EntityKind::Dust));
        s.schedule(1, 1.0, TimerAction::SpawnerReady(EntityKind::Germ));
        assert_eq!(
            s.poll(4.0, 1),
            vec![
                TimerAction::SpawnerReady(EntityKind::Dust),
                TimerAction::SpawnerReady(EntityKind::Germ),
                TimerAction::InvincibilityExpired,
            ]
        );
    }

    #[test]
    fn test_stale_session_tasks_never_fire() {
        let mut s = Scheduler::new();
        s.schedule(1, 1.0, TimerAction::InvincibilityExpired);
        s.schedule(2, 1.0, TimerAction::SpawnerReady(EntityKind::Germ));
        assert_eq!(
            s.poll(2.0, 2),
            vec![TimerAction::SpawnerReady(EntityKind::Germ)]
        );
        assert!(s.is_empty());
    }

    #[test]
    fn test_cancel_all() {
        let mut s = Scheduler::new();
        s.schedule(1, 1.0, TimerAction::InvincibilityExpired);
        s.schedule(1, 2.0, TimerAction::SpawnerReady(EntityKind::Knowledge));
        assert_eq!(s.cancel_all(), 2);
        assert_eq!(s.len(), 0);
    }
}
