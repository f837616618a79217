//! Alert system for displaying success and error messages to users.

use maud::{Markup, html};
use serde::{Deserialize, Serialize};

/// Alert message types for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Success,
    Error,
}

/// A message shown at the top of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "kind")]
    pub alert_type: AlertType,
    pub message: String,
}

impl Alert {
    /// Create a new success alert
    pub fn success(message: &str) -> Self {
        Self {
            alert_type: AlertType::Success,
            message: message.to_owned(),
        }
    }

    /// Create a new error alert
    pub fn error(message: &str) -> Self {
        Self {
            alert_type: AlertType::Error,
            message: message.to_owned(),
        }
    }

    pub fn into_html(self) -> Markup {
        let style = match self.alert_type {
            AlertType::Success => {
                "text-green-800 bg-green-50 border-green-300 \
                dark:bg-gray-800 dark:text-green-400 dark:border-green-800"
            }
            AlertType::Error => {
                "text-red-800 bg-red-50 border-red-300 \
                dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
            }
        };

        html! {
            div
                role="alert"
                data-alert-type=(match self.alert_type {
                    AlertType::Success => "success",
                    AlertType::Error => "error",
                })
                class={ "flex items-center w-full max-w-md p-4 mb-4 text-sm rounded-lg border " (style) }
            {
                (self.message)
            }
        }
    }
}
