//! Projection bundle trait definition.

use std::sync::Arc;

use tally_core::ports::EventHandler;

/// A self-contained bundle of handlers for one projection.
///
/// Bundles provide a plugin-like architecture where each bundle can:
/// - Define its own database schema via migrations
/// - Register one or more event handlers
/// - Be independently developed and tested
///
/// # Example
///
/// ```ignore
/// pub struct MyBundle { /* ... */ }
///
/// impl ProjectionBundle for MyBundle {
///     fn name(&self) -> &'static str { "my_projection" }
///
///     fn handlers(&self) -> Vec<Arc<dyn EventHandler>> {
///         vec![Arc::new(MyProjection::new())]
///     }
///
///     fn migrations(&self) -> &'static [&'static str] {
///         &[include_str!("migrations/001_init.sql")]
///     }
/// }
/// ```
pub trait ProjectionBundle: Send + Sync {
    /// Unique name identifying this bundle.
    ///
    /// Used for logging and migration tracking.
    fn name(&self) -> &'static str;

    /// Returns all event handlers provided by this bundle.
    ///
    /// These handlers will be registered with the projector's HandlerRegistry.
    fn handlers(&self) -> Vec<Arc<dyn EventHandler>>;

    /// SQL migration statements for this bundle's schema.
    ///
    /// Migrations are executed in order when the bundle is registered.
    /// Each string should be a complete SQL statement or set of statements.
    fn migrations(&self) -> &'static [&'static str] {
        &[]
    }

    /// Priority for bundle initialization (higher = earlier).
    ///
    /// Bundles with dependencies on other bundles should use lower priority.
    /// Default is 0.
    fn priority(&self) -> i32 {
        0
    }

    /// Called after all migrations have been run.
    ///
    /// Override this for any post-migration initialization.
    fn on_initialized(&self) {}

    /// Tables owned by this bundle that should be truncated during purge.
    ///
    /// Return the table names that this bundle creates and manages.
    /// These tables will be explicitly truncated when running `--purge`.
    fn tables_to_purge(&self) -> &'static [&'static str] {
        &[]
    }
}
