/*
 * System Metrics
 *
 * Aggregate performance figures for a finished (or stopped) run: the list of
 * completed processes, CPU/idle totals and the engine's context-switch
 * count, plus the derived averages the front-ends display.
 */

use std::sync::Arc;

use crate::process::Process;

#[derive(Clone, Default)]
pub struct SystemMetrics {
    completed: Vec<Arc<Process>>,
    total_cpu_time: u64,
    total_idle_time: u64,
    context_switches: u64,
}

impl SystemMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_completed_process(&mut self, process: Arc<Process>) {
        self.completed.push(process);
    }

    pub fn completed_processes(&self) -> Vec<Arc<Process>> {
        self.completed.clone()
    }

    pub fn total_cpu_time(&self) -> u64 {
        self.total_cpu_time
    }

    pub fn set_total_cpu_time(&mut self, ticks: u64) {
        self.total_cpu_time = ticks;
    }

    pub fn total_idle_time(&self) -> u64 {
        self.total_idle_time
    }

    pub fn set_total_idle_time(&mut self, ticks: u64) {
        self.total_idle_time = ticks;
    }

    pub fn context_switches(&self) -> u64 {
        self.context_switches
    }

    pub fn set_context_switches(&mut self, count: u64) {
        self.context_switches = count;
    }

    /// Mean waiting time over completed processes, 0 when none finished.
    pub fn average_waiting_time(&self) -> f64 {
        if self.completed.is_empty() {
            return 0.0;
        }
        let total: u64 = self.completed.iter().map(|p| p.waiting_time()).sum();
        total as f64 / self.completed.len() as f64
    }

    /// Mean turnaround time over completed processes, 0 when none finished.
    pub fn average_turnaround_time(&self) -> f64 {
        if self.completed.is_empty() {
            return 0.0;
        }
        let total: u64 = self.completed.iter().map(|p| p.turnaround_time()).sum();
        total as f64 / self.completed.len() as f64
    }

    /// CPU busy share in percent over the whole run.
    pub fn cpu_utilization(&self) -> f64 {
        let total = self.total_cpu_time + self.total_idle_time;
        if total == 0 {
            return 0.0;
        }
        self.total_cpu_time as f64 / total as f64 * 100.0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
