//! Metric Trait
//!
//! Stateful metrics accumulate statistics over many updates and report a
//! single score computed from everything seen since the last reset.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

/// A metric with accumulated state.
pub trait Metric: Send + Sync {
    /// Short identifier of the metric.
    fn name(&self) -> &str;

    /// Score over all accumulated updates.
    fn result(&self) -> f64;

    /// Clears all accumulated statistics.
    fn reset_state(&mut self);
}
