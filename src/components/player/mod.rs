use crate::components::Icon;
use dioxus::prelude::*;
use rep_player::config::PlayerConfig;
use rep_player::platform;
use rep_player::player::{LaunchContext, PlaybackState, PlayerHandle, PlayerSession, Role};
use tracing::error;

mod controls;

use controls::{PlayPauseButton, PopoutButton, StatusBadge, VolumeSlider};

/// Latest replica reported by the session.
#[derive(Clone, Copy, PartialEq)]
pub struct PlaybackSignal(pub Signal<PlaybackState>);

/// `None` when the sync channel could not be joined.
#[derive(Clone)]
pub struct SessionHandle(pub Option<PlayerHandle>);

/// Starts one session per mount and mirrors its state into a signal.
fn use_player_session(
    launch: &LaunchContext,
    config: &PlayerConfig,
) -> (Signal<PlaybackState>, Option<PlayerHandle>) {
    let mut playback = use_signal(|| launch.initial.clone());

    let handle = use_hook(|| {
        let connector = platform::connector();
        match PlayerSession::start(launch, config, &connector, platform::capabilities()) {
            Ok((session, handle)) => {
                let session = session.on_change(move |state| playback.set(state.clone()));
                spawn(session.run());

                let unload = handle.clone();
                platform::on_page_hide(move || unload.unload());
                Some(handle)
            }
            Err(err) => {
                error!(%err, role = launch.role.as_str(), "player session could not start");
                None
            }
        }
    });

    {
        let handle = handle.clone();
        use_drop(move || {
            if let Some(handle) = &handle {
                handle.shutdown();
            }
        });
    }

    (playback, handle)
}

#[component]
pub fn Player(launch: LaunchContext, config: PlayerConfig, label: String) -> Element {
    let (playback, handle) = use_player_session(&launch, &config);
    let connected = handle.is_some();
    use_context_provider(|| PlaybackSignal(playback));
    use_context_provider(|| SessionHandle(handle));

    let role = launch.role;
    let streaminfo_user = config.streaminfo_username.clone();
    let state = playback();
    let show_popout = role == Role::Primary && !state.is_popup_active;
    let shell_class = if state.is_playing {
        "player-shell player-shell--playing"
    } else {
        "player-shell"
    };

    rsx! {
        div { class: "{shell_class}",
            div { class: "player-main",
                PlayPauseButton { disabled: !connected }
                div { class: "player-info",
                    div { class: "player-heading",
                        span { class: "player-label", "{label}" }
                        StatusBadge { role }
                    }
                    span { class: "player-title",
                        Icon { name: "radio".to_string(), class: "player-title-icon".to_string() }
                        // Filled in by the Centova Cast script the host page loads.
                        span {
                            class: "cc_streaminfo",
                            "data-type": "song",
                            "data-username": "{streaminfo_user}",
                            "Loading ..."
                        }
                    }
                }
            }
            div { class: "player-side",
                VolumeSlider { disabled: !connected }
                if show_popout {
                    PopoutButton { disabled: !connected }
                }
            }
            if !connected {
                p { class: "player-error", "Synchronisation unavailable, controls disabled." }
            }
        }
    }
}
