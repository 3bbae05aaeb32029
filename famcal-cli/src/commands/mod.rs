pub mod add;
pub mod browse;
pub mod delete;
pub mod edit;
pub mod holidays;
pub mod login;
pub mod month;
pub mod show;
pub mod sync;

use owo_colors::OwoColorize;

use crate::context::Service;

/// Print the service's toast, if one is showing.
pub fn print_toast(service: &Service) {
    if let Some(message) = service.toast() {
        println!("{}", format!("  {}", message).green());
    }
}
