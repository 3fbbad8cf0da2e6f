//! UI state partitions.
//!
//! `app` is registered for the lifetime of the store. `itemUi` and
//! `productUi` are injected while a resource view is mounted and dropped
//! from the aggregate state when it unmounts.

use stockpile_cache::{reducer, PartitionRegistry, Reducer, Store};
use stockpile_core::Resource;

pub const APP_PARTITION: &str = "app";

/// Application-wide status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub status: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            status: "idle".to_string(),
        }
    }
}

/// Per-resource view state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceUiState {
    pub is_loading: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    SetStatus(String),
    SetLoading { resource: Resource, loading: bool },
    SetMessage { resource: Resource, message: Option<String> },
}

/// Partition name holding `resource`'s view state.
pub fn ui_partition(resource: Resource) -> &'static str {
    match resource {
        Resource::Items => "itemUi",
        Resource::Products => "productUi",
    }
}

pub fn app_reducer() -> impl Reducer<UiAction> {
    reducer(AppState::default(), |mut state: AppState, action: &UiAction| {
        if let UiAction::SetStatus(status) = action {
            state.status = status.clone();
        }
        state
    })
}

/// Reducer for one resource's view; actions for other resources pass
/// through untouched.
pub fn resource_ui_reducer(resource: Resource) -> impl Reducer<UiAction> {
    reducer(
        ResourceUiState::default(),
        move |mut state: ResourceUiState, action: &UiAction| {
            match action {
                UiAction::SetLoading { resource: r, loading } if *r == resource => {
                    state.is_loading = *loading;
                }
                UiAction::SetMessage { resource: r, message } if *r == resource => {
                    state.message = message.clone();
                }
                _ => {}
            }
            state
        },
    )
}

/// A store with only the `app` partition registered.
pub fn ui_store() -> Store<UiAction> {
    let mut registry = PartitionRegistry::new();
    registry.add(APP_PARTITION, app_reducer());
    Store::new(registry)
}
