//! Page navigation seam

use std::sync::Mutex;

/// Performs page-level navigation on behalf of the core
pub trait Navigator: Send + Sync {
    /// Leave the current page for `location`
    fn redirect(&self, location: &str);

    /// Reload the current page
    fn reload(&self);
}

/// Navigator for headless hosts: logs requests and does nothing else
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect(&self, location: &str) {
        log::info!("Navigation requested: {}", location);
    }

    fn reload(&self) {
        log::info!("Page reload requested");
    }
}

/// A navigation request recorded by [`RecordingNavigator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    Redirect(String),
    Reload,
}

/// Navigator that records every request, for hosts that apply navigation
/// themselves and for tests
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    events: Mutex<Vec<NavigationEvent>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NavigationEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                NavigationEvent::Redirect(to) => Some(to),
                NavigationEvent::Reload => None,
            })
            .collect()
    }

    pub fn reload_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == NavigationEvent::Reload)
            .count()
    }

    fn record(&self, event: NavigationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, location: &str) {
        self.record(NavigationEvent::Redirect(location.to_string()));
    }

    fn reload(&self) {
        self.record(NavigationEvent::Reload);
    }
}
