// handlers/mod.rs - HTTP handlers
//
// Public:     /healthz, /no-auth, /todos
// Basic auth: /basic-auth
// Diagnostics for the middleware chain: /os, /log, /log2, /slow

pub mod diagnostics;
pub mod health;
pub mod todo;

use crate::services::TodoService;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub todos: TodoService,
}

impl AppState {
    pub fn new(todos: TodoService) -> Self {
        Self { todos }
    }
}
