//! W′ balance accounting (Skiba model).
//!
//! Above CP the anaerobic reserve drains linearly with the power surplus.
//! Below CP it refills exponentially toward capacity with a time constant
//! that depends on how deep the recovery is: τ = 546·e^(−0.01·D_cp) + 316,
//! where D_cp is the gap between CP and the rider's recent power.

use std::collections::VecDeque;

/// Window for the recovery-intensity rolling average, in seconds.
const RECENT_POWER_WINDOW_S: f64 = 30.0;

/// Skiba recovery time constant for a given depth below CP.
pub fn recovery_tau(d_cp: f64) -> f64 {
    546.0 * (-0.01 * d_cp).exp() + 316.0
}

/// Time-weighted rolling average of recent power.
///
/// Samples arrive with irregular durations (one per atomic segment), so
/// the window is tracked in accumulated seconds rather than sample counts.
#[derive(Debug, Clone, Default)]
pub struct RecentPower {
    samples: VecDeque<(f64, f64)>, // (power_w, dt_s)
    sum_power_time: f64,
    sum_time: f64,
}

impl RecentPower {
    pub fn add(&mut self, power_w: f64, dt_s: f64) {
        if dt_s <= 0.0 {
            return;
        }
        self.samples.push_back((power_w, dt_s));
        self.sum_power_time += power_w * dt_s;
        self.sum_time += dt_s;

        while let Some(&(p, dt)) = self.samples.front() {
            if self.sum_time - dt < RECENT_POWER_WINDOW_S {
                break;
            }
            self.samples.pop_front();
            self.sum_power_time -= p * dt;
            self.sum_time -= dt;
        }
    }

    pub fn average(&self) -> Option<f64> {
        if self.sum_time > 0.0 {
            Some(self.sum_power_time / self.sum_time)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.sum_power_time = 0.0;
        self.sum_time = 0.0;
    }
}

/// Tracks the anaerobic reserve through a simulation trial.
#[derive(Debug, Clone)]
pub struct WPrimeBalance {
    cp_w: f64,
    capacity_j: f64,
    balance_j: f64,
    bonked: bool,
    recent: RecentPower,
}

impl WPrimeBalance {
    pub fn new(cp_w: f64, capacity_j: f64) -> Self {
        Self {
            cp_w,
            capacity_j,
            balance_j: capacity_j,
            bonked: false,
            recent: RecentPower::default(),
        }
    }

    /// Apply one interval of actual power.
    pub fn update(&mut self, power_w: f64, dt_s: f64) {
        if dt_s <= 0.0 {
            return;
        }
        self.recent.add(power_w, dt_s);

        if power_w > self.cp_w {
            self.balance_j -= (power_w - self.cp_w) * dt_s;
        } else {
            let p_recent = self.recent.average().unwrap_or(power_w);
            let d_cp = (self.cp_w - p_recent).max(0.0);
            if d_cp > 0.0 {
                let tau = recovery_tau(d_cp);
                let deficit = self.capacity_j - self.balance_j;
                self.balance_j = self.capacity_j - deficit * (-dt_s / tau).exp();
            }
            // Riding exactly at CP neither drains nor refills.
        }

        if self.balance_j < 0.0 {
            self.bonked = true;
        }
    }

    pub fn balance_j(&self) -> f64 {
        self.balance_j
    }

    pub fn capacity_j(&self) -> f64 {
        self.capacity_j
    }

    /// Whether the reserve has ever gone below zero. Latched: a later
    /// recovery does not clear it, because the trial already failed.
    pub fn is_bonked(&self) -> bool {
        self.bonked
    }

    pub fn reset(&mut self) {
        self.balance_j = self.capacity_j;
        self.bonked = false;
        self.recent.reset();
    }
}
