//! Per-episode session statistics

use std::collections::VecDeque;

use time::OffsetDateTime;
use time::macros::format_description;

use super::env::EpisodeSummary;

/// Window over the summaries of the last few episodes
#[derive(Debug, Clone)]
pub struct RecentEpisodes {
    summaries: VecDeque<EpisodeSummary>,
    capacity: usize,
}

impl RecentEpisodes {
    pub fn new(capacity: usize) -> Self {
        Self {
            summaries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, summary: EpisodeSummary) {
        if self.capacity == 0 {
            return;
        }
        if self.summaries.len() == self.capacity {
            self.summaries.pop_front();
        }
        self.summaries.push_back(summary);
    }

    /// Field-wise mean of the window, `None` before the first episode
    pub fn mean(&self) -> Option<EpisodeSummary> {
        if self.summaries.is_empty() {
            return None;
        }

        let n = self.summaries.len() as f64;
        let total = self
            .summaries
            .iter()
            .fold(EpisodeSummary::default(), |acc, s| EpisodeSummary {
                negative_reward: acc.negative_reward + s.negative_reward,
                cumulative_wait: acc.cumulative_wait + s.cumulative_wait,
                avg_queue_length: acc.avg_queue_length + s.avg_queue_length,
            });

        Some(EpisodeSummary {
            negative_reward: total.negative_reward / n,
            cumulative_wait: total.cumulative_wait / n,
            avg_queue_length: total.avg_queue_length / n,
        })
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

/// Episode stores of a training session, one entry per episode
#[derive(Debug)]
pub struct SessionMetrics {
    /// Sum of negative rewards
    pub reward_store: Vec<f64>,
    /// Queued vehicle-seconds
    pub cumulative_wait_store: Vec<f64>,
    /// Mean halted vehicles per tick
    pub avg_queue_length_store: Vec<f64>,
    /// Mean replay loss of every episode that trained
    pub loss_store: Vec<f32>,
    /// Last episodes, for progress lines
    pub recent: RecentEpisodes,
    started_at: OffsetDateTime,
}

impl SessionMetrics {
    pub fn new(window_size: usize) -> Self {
        Self {
            reward_store: Vec::new(),
            cumulative_wait_store: Vec::new(),
            avg_queue_length_store: Vec::new(),
            loss_store: Vec::new(),
            recent: RecentEpisodes::new(window_size),
            started_at: now(),
        }
    }

    pub fn record_episode(&mut self, summary: &EpisodeSummary) {
        self.reward_store.push(summary.negative_reward);
        self.cumulative_wait_store.push(summary.cumulative_wait);
        self.avg_queue_length_store.push(summary.avg_queue_length);
        self.recent.push(*summary);
    }

    pub fn record_loss(&mut self, loss: f32) {
        self.loss_store.push(loss);
    }

    pub fn episodes(&self) -> usize {
        self.reward_store.len()
    }

    /// Index and value of the least negative episode reward
    pub fn best_episode(&self) -> Option<(usize, f64)> {
        self.reward_store
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Session Summary ===");
        tracing::info!("Start time: {}", format_timestamp(self.started_at));
        tracing::info!("End time: {}", format_timestamp(now()));
        tracing::info!("Episodes: {}", self.episodes());
        if let Some(recent) = self.recent.mean() {
            tracing::info!(
                "Last {} episodes: reward {:.1}, delay {:.0}s, avg queue {:.2}",
                self.recent.len(),
                recent.negative_reward,
                recent.cumulative_wait,
                recent.avg_queue_length
            );
        }
        if let Some(loss) = self.loss_store.last() {
            tracing::info!("Last replay loss: {:.4}", loss);
        }
        if let Some((episode, reward)) = self.best_episode() {
            tracing::info!("Best episode: {} (reward {:.1})", episode + 1, reward);
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new(10)
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| at.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(negative_reward: f64, cumulative_wait: f64, avg_queue_length: f64) -> EpisodeSummary {
        EpisodeSummary {
            negative_reward,
            cumulative_wait,
            avg_queue_length,
        }
    }

    #[test]
    fn test_recent_episodes_window() {
        let mut recent = RecentEpisodes::new(2);
        assert_eq!(recent.mean(), None);

        recent.push(summary(-100.0, 400.0, 1.0));
        recent.push(summary(-50.0, 200.0, 3.0));
        assert_eq!(recent.mean(), Some(summary(-75.0, 300.0, 2.0)));

        recent.push(summary(-10.0, 0.0, 0.0)); // evicts the first episode
        assert_eq!(recent.len(), 2);
        assert_eq!(recent.mean(), Some(summary(-30.0, 100.0, 1.5)));
    }

    #[test]
    fn test_session_stores() {
        let mut metrics = SessionMetrics::new(5);

        metrics.record_episode(&summary(-300.0, 1200.0, 2.0));
        metrics.record_episode(&summary(-120.0, 600.0, 1.0));
        metrics.record_loss(0.25);

        assert_eq!(metrics.episodes(), 2);
        assert_eq!(metrics.cumulative_wait_store, vec![1200.0, 600.0]);
        assert_eq!(metrics.loss_store, vec![0.25]);
        assert_eq!(metrics.best_episode(), Some((1, -120.0)));
        assert_eq!(metrics.recent.mean(), Some(summary(-210.0, 900.0, 1.5)));
    }

    #[test]
    fn test_format_timestamp() {
        let at = OffsetDateTime::UNIX_EPOCH;
        assert_eq!(format_timestamp(at), "1970-01-01 00:00:00");
    }
}
