use crate::components::{Icon, Player};
use dioxus::prelude::*;
use rep_player::api::{load_site_content, SiteContent};
use rep_player::config::DEFAULT_APP_NAME;
use rep_player::platform;
use rep_player::player::{LaunchContext, Role};

#[component]
pub fn AppShell() -> Element {
    // Resolves either way: a failed or stalled feed yields the defaults.
    let site = use_resource(|| async move {
        let timer = platform::timer();
        load_site_content(platform::page_origin(), timer.as_ref()).await
    });

    let Some(content) = site.read().clone() else {
        return rsx! { LoadingScreen {} };
    };

    rsx! { PlayerRoot { content } }
}

#[component]
fn PlayerRoot(content: SiteContent) -> Element {
    let config = content.player_config();
    let label = content.app_name();
    let launch = LaunchContext::from_query(&platform::launch_query(), config.default_volume);
    let shell_class = match launch.role {
        Role::Primary => "app-shell",
        Role::Popout => "app-shell app-shell--popout",
    };

    rsx! {
        div { class: "{shell_class}",
            Player { launch, config, label }
        }
    }
}

#[component]
fn LoadingScreen() -> Element {
    rsx! {
        div { class: "loading-screen",
            Icon { name: "loader".to_string(), class: "loading-spinner".to_string() }
            div { class: "loading-label", "{DEFAULT_APP_NAME}" }
        }
    }
}
