/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, Google sign-in and password reset
/// - `profile`: Profile, picture, password and Google linking
/// - `todos`: Todo CRUD
/// - `tasks`: Task CRUD, completion, search and statistics
/// - `pomodoro`: Focus session tracking
/// - `devices`: Push notification device tokens

pub mod auth;
pub mod devices;
pub mod health;
pub mod pomodoro;
pub mod profile;
pub mod tasks;
pub mod todos;
