//! The landing page.

use axum::response::{IntoResponse, Response};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};

use crate::{
    alert::Alert,
    endpoints,
    flash::take_flash,
    html::{BUTTON_PRIMARY_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, base, flash_message},
};

fn home_view(alert: Option<Alert>) -> Markup {
    let content = html! {
        (flash_message(alert))

        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="mb-4 text-4xl font-extrabold tracking-tight lg:text-5xl"
            {
                "Welcome to SecureBank"
            }

            p class="mb-8 text-lg text-gray-500 dark:text-gray-400"
            {
                "Check your balance and recent transactions in one place."
            }

            div class="flex flex-col w-full max-w-xs gap-4"
            {
                a href=(endpoints::LOG_IN_VIEW) class={ "text-center " (BUTTON_PRIMARY_STYLE) }
                {
                    "Log in"
                }

                a href=(endpoints::REGISTER_VIEW) class={ "text-center " (LINK_STYLE) }
                {
                    "Register"
                }
            }
        }
    };

    base("Home", &content)
}

/// Display the landing page and any pending flash message, e.g. the log-out confirmation.
pub async fn get_home_page(jar: PrivateCookieJar) -> Response {
    let (jar, alert) = take_flash(jar);

    (jar, home_view(alert)).into_response()
}
