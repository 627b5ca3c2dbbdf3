//! System metrics sampling for the Fleetboard agent
//!
//! Produces the 8-feature report the kernel expects:
//! - raw cpu/memory/disk percentages and network throughput
//! - rolling 5-sample window features (cpu_mean_5, cpu_std_5, mem_mean_5, net_rate)
//!
//! A simulation mode generates jittered synthetic values so several fake
//! devices can be run from one host while developing the dashboard.

use std::collections::VecDeque;
use std::time::Instant;

use sysinfo::{Disks, Networks, System};

const ROLLING_WINDOW: usize = 5;

/// One report-ready sample.
#[derive(Debug, Clone)]
pub struct Sample {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub net_io: f64,
    pub cpu_mean_5: f64,
    pub cpu_std_5: f64,
    pub mem_mean_5: f64,
    pub net_rate: f64,
}

/// Fixed-capacity rolling window with mean/std over the retained samples.
pub struct RollingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population standard deviation over the window.
    pub fn std(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / self.values.len() as f64;
        variance.sqrt()
    }
}

pub struct MetricsCollector {
    system: System,
    disks: Disks,
    networks: Networks,
    cpu_window: RollingWindow,
    mem_window: RollingWindow,
    net_window: RollingWindow,
    last_net_total: u64,
    last_sample_at: Instant,
    simulate: bool,
}

impl MetricsCollector {
    pub fn new(simulate: bool) -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        let networks = Networks::new_with_refreshed_list();
        let last_net_total = total_net_bytes(&networks);

        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            networks,
            cpu_window: RollingWindow::new(ROLLING_WINDOW),
            mem_window: RollingWindow::new(ROLLING_WINDOW),
            net_window: RollingWindow::new(ROLLING_WINDOW),
            last_net_total,
            last_sample_at: Instant::now(),
            simulate,
        }
    }

    pub fn sample(&mut self) -> Sample {
        let (cpu, memory, disk, net_io) = if self.simulate {
            simulated_readings()
        } else {
            self.host_readings()
        };

        self.cpu_window.push(cpu);
        self.mem_window.push(memory);
        self.net_window.push(net_io);

        Sample {
            cpu_usage: cpu,
            memory_usage: memory,
            disk_usage: disk,
            net_io,
            cpu_mean_5: self.cpu_window.mean(),
            cpu_std_5: self.cpu_window.std(),
            mem_mean_5: self.mem_window.mean(),
            net_rate: self.net_window.mean(),
        }
    }

    fn host_readings(&mut self) -> (f64, f64, f64, f64) {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.disks.refresh();
        self.networks.refresh();

        let cpu = self.system.global_cpu_info().cpu_usage() as f64;

        let total_mem = self.system.total_memory();
        let memory = if total_mem > 0 {
            let used = total_mem - self.system.available_memory();
            (used as f64 / total_mem as f64) * 100.0
        } else {
            0.0
        };

        let (total_disk, available_disk) = self
            .disks
            .iter()
            .fold((0u64, 0u64), |(total, avail), disk| {
                (total + disk.total_space(), avail + disk.available_space())
            });
        let disk = if total_disk > 0 {
            ((total_disk - available_disk) as f64 / total_disk as f64) * 100.0
        } else {
            0.0
        };

        // débit réseau en octets/s depuis le dernier sample
        let elapsed = self.last_sample_at.elapsed().as_secs_f64().max(f64::EPSILON);
        let net_total = total_net_bytes(&self.networks);
        let net_io = net_total.saturating_sub(self.last_net_total) as f64 / elapsed;
        self.last_net_total = net_total;
        self.last_sample_at = Instant::now();

        (cpu, memory, disk, net_io)
    }
}

fn total_net_bytes(networks: &Networks) -> u64 {
    networks
        .iter()
        .map(|(_, data)| data.total_received() + data.total_transmitted())
        .sum()
}

/// Simulated readings, jittered around plausible baselines.
fn simulated_readings() -> (f64, f64, f64, f64) {
    let cpu = 30.0 + rand::random::<f64>() * 60.0;
    let memory = 40.0 + rand::random::<f64>() * 40.0;
    let disk = 25.0 + rand::random::<f64>() * 50.0;
    let net_io = 50.0 + rand::random::<f64>() * 400.0;
    (cpu, memory, disk, net_io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_window_evicts_oldest() {
        let mut window = RollingWindow::new(5);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
            window.push(v);
        }
        // 1.0 évincé : moyenne de 2..=6
        assert!((window.mean() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_window_std() {
        let mut window = RollingWindow::new(5);
        for v in [2.0, 4.0, 4.0, 4.0, 6.0] {
            window.push(v);
        }
        assert!((window.mean() - 4.0).abs() < 1e-9);
        assert!((window.std() - (8.0f64 / 5.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_empty_window_is_zero() {
        let window = RollingWindow::new(5);
        assert_eq!(window.mean(), 0.0);
        assert_eq!(window.std(), 0.0);
    }

    #[test]
    fn test_simulated_sample_has_window_features() {
        let mut collector = MetricsCollector::new(true);
        let first = collector.sample();
        // un seul échantillon : la moyenne glissante égale la valeur brute
        assert!((first.cpu_mean_5 - first.cpu_usage).abs() < 1e-9);
        assert_eq!(first.cpu_std_5, 0.0);

        let second = collector.sample();
        assert!(second.cpu_usage >= 30.0 && second.cpu_usage <= 90.0);
        assert!(second.net_rate > 0.0);
    }
}
