// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The method interceptor: in-place installation of telemetry wrappers.
//!
//! Interception works by decoration rather than mutation: a client owns its
//! call surfaces as `Option<Arc<dyn …>>` slots, and [`install`] swaps the
//! handle in a slot for a wrapper implementing the same surface trait. All
//! calls forwarded through that client — including from values constructed
//! before installation — flow through the wrapper from then on.
//!
//! Installation is idempotent. The wrapper types report
//! [`CallSurface::is_instrumented`] as `true`, and [`install`] refuses to
//! wrap a handle that already carries the marker, so running an adapter
//! twice produces exactly one wrapper layer. Installed sites are additionally
//! recorded in a process-wide [`Registry`] for operator introspection.
//!
//! [`CallSurface::is_instrumented`]: crate::surface::CallSurface::is_instrumented

mod wrapper;

pub use wrapper::{InstrumentedCompletions, InstrumentedMessages};

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::surface::CallSurface;

/// Identifies one instrumentable call surface of one client family.
///
/// The blocking and async call kinds are both carried by the surface trait,
/// so a site covers the method pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// Client family, e.g. `"anthropic"`.
    pub library: &'static str,

    /// Resource the method lives on, e.g. `"messages"`.
    pub surface: &'static str,

    /// Method name, e.g. `"create"`.
    pub method: &'static str,
}

impl CallSite {
    /// Define a call site.
    pub const fn new(library: &'static str, surface: &'static str, method: &'static str) -> Self {
        Self {
            library,
            surface,
            method,
        }
    }

    /// Dotted key, e.g. `"anthropic.messages.create"`.
    pub fn key(&self) -> String {
        format!("{}.{}.{}", self.library, self.surface, self.method)
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.library, self.surface, self.method)
    }
}

/// The call kind flowing through a wrapped site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Blocks the calling thread for the duration of the call.
    Blocking,
    /// Suspends the calling task at the underlying call's await point.
    Async,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking => write!(f, "blocking"),
            Self::Async => write!(f, "async"),
        }
    }
}

/// Result of one installation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The surface was wrapped.
    Installed,
    /// The surface already carried the installed-marker; nothing was done.
    AlreadyInstrumented,
    /// The surface is not present in this client build; nothing to wrap.
    NotApplicable,
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed => write!(f, "installed"),
            Self::AlreadyInstrumented => write!(f, "already instrumented"),
            Self::NotApplicable => write!(f, "not applicable"),
        }
    }
}

/// Process-wide ledger of wrapped call sites.
///
/// Advisory: the installed-marker on the surface handle is the idempotency
/// guard; the registry exists so operators can ask what instrumentation
/// actually took effect.
#[derive(Debug, Default)]
pub struct Registry {
    sites: RwLock<BTreeSet<String>>,
}

impl Registry {
    fn record(&self, site: &CallSite) {
        self.sites.write().unwrap().insert(site.key());
    }

    /// Check whether a site has been wrapped in this process.
    pub fn contains(&self, site: &CallSite) -> bool {
        self.sites.read().unwrap().contains(&site.key())
    }

    /// Keys of all wrapped sites, sorted.
    pub fn installed_sites(&self) -> Vec<String> {
        self.sites.read().unwrap().iter().cloned().collect()
    }
}

/// Global registry instance.
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::default);

/// Install a wrapper onto a client's surface slot.
///
/// - An empty slot reports [`InstallOutcome::NotApplicable`] and performs no
///   action — this is how version drift in a client build is tolerated.
/// - A handle already carrying the installed-marker reports
///   [`InstallOutcome::AlreadyInstrumented`] and performs no action.
/// - Otherwise the handle is replaced by `wrap(original)` and the site is
///   recorded in the global registry.
pub fn install<T>(
    slot: &mut Option<Arc<T>>,
    site: &CallSite,
    wrap: impl FnOnce(Arc<T>) -> Arc<T>,
) -> InstallOutcome
where
    T: CallSurface + ?Sized,
{
    let Some(original) = slot.take() else {
        return InstallOutcome::NotApplicable;
    };

    if original.is_instrumented() {
        *slot = Some(original);
        return InstallOutcome::AlreadyInstrumented;
    }

    *slot = Some(wrap(original));
    REGISTRY.record(site);
    InstallOutcome::Installed
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pristine;
    struct Wrapped;

    impl CallSurface for Pristine {}

    impl CallSurface for Wrapped {
        fn is_instrumented(&self) -> bool {
            true
        }
    }

    const SITE: CallSite = CallSite::new("stub", "messages", "create");

    #[test]
    fn test_call_site_key() {
        assert_eq!(SITE.key(), "stub.messages.create");
        assert_eq!(SITE.to_string(), "stub.messages.create");
    }

    #[test]
    fn test_install_on_empty_slot_is_not_applicable() {
        let mut slot: Option<Arc<dyn CallSurface>> = None;
        let outcome = install(&mut slot, &SITE, |inner| inner);
        assert_eq!(outcome, InstallOutcome::NotApplicable);
        assert!(slot.is_none());
    }

    #[test]
    fn test_install_wraps_pristine_surface() {
        let site = CallSite::new("stub", "completions", "create");
        let mut slot: Option<Arc<dyn CallSurface>> = Some(Arc::new(Pristine));

        let outcome = install(&mut slot, &site, |_inner| Arc::new(Wrapped));
        assert_eq!(outcome, InstallOutcome::Installed);
        assert!(slot.as_ref().unwrap().is_instrumented());
        assert!(REGISTRY.contains(&site));
    }

    #[test]
    fn test_install_is_idempotent() {
        let mut slot: Option<Arc<dyn CallSurface>> = Some(Arc::new(Pristine));

        assert_eq!(
            install(&mut slot, &SITE, |_inner| Arc::new(Wrapped)),
            InstallOutcome::Installed
        );
        assert_eq!(
            install(&mut slot, &SITE, |_inner| panic!("must not wrap twice")),
            InstallOutcome::AlreadyInstrumented
        );
    }

    #[test]
    fn test_registry_lists_sorted_keys() {
        let a = CallSite::new("stub", "a", "create");
        let b = CallSite::new("stub", "b", "create");
        REGISTRY.record(&b);
        REGISTRY.record(&a);

        let sites = REGISTRY.installed_sites();
        let pos_a = sites.iter().position(|s| s == "stub.a.create").unwrap();
        let pos_b = sites.iter().position(|s| s == "stub.b.create").unwrap();
        assert!(pos_a < pos_b);
    }
}
