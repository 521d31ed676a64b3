//! Logging facilities for Trellis.
//!
//! Trellis uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in the embedding application:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core systems target.
    pub const CORE: &str = "trellis_core";
    /// Timer system target.
    pub const TIMER: &str = "trellis_core::timer";
    /// Layout engine target.
    pub const LAYOUT: &str = "trellis::layout";
    /// Form orchestration target.
    pub const FORM: &str = "trellis::form";
    /// Traversal and focus target.
    pub const TRAVERSAL: &str = "trellis::traversal";
    /// Application callback dispatch target.
    pub const CALLBACK: &str = "trellis::callback";
}
