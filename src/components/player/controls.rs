use crate::components::{Icon, PlaybackSignal, SessionHandle};
use dioxus::prelude::*;
use rep_player::player::Role;

/// Play/pause button - runs the session's toggle path
#[component]
pub(super) fn PlayPauseButton(disabled: bool) -> Element {
    let playback = use_context::<PlaybackSignal>().0;
    let handle = use_context::<SessionHandle>().0;
    let playing = playback().is_playing;

    rsx! {
        button {
            id: "play-pause-btn",
            r#type: "button",
            disabled,
            class: if playing { "play-btn play-btn--playing" } else { "play-btn" },
            aria_label: if playing { "Pause" } else { "Play" },
            onclick: move |_| {
                if let Some(handle) = &handle {
                    handle.toggle();
                }
            },
            if playing {
                Icon { name: "pause".to_string(), class: "play-btn-icon".to_string() }
            } else {
                Icon { name: "play".to_string(), class: "play-btn-icon".to_string() }
            }
        }
    }
}

#[component]
pub(super) fn VolumeSlider(disabled: bool) -> Element {
    let playback = use_context::<PlaybackSignal>().0;
    let handle = use_context::<SessionHandle>().0;
    let percent = (playback().volume * 100.0).round();

    let on_volume_change = move |e: Event<FormData>| {
        if let Ok(val) = e.value().parse::<f64>() {
            if let Some(handle) = &handle {
                handle.set_volume((val / 100.0).clamp(0.0, 1.0));
            }
        }
    };

    rsx! {
        div { class: "volume",
            Icon { name: "volume".to_string(), class: "volume-icon".to_string() }
            input {
                r#type: "range",
                min: "0",
                max: "100",
                value: "{percent}",
                disabled,
                class: "volume-slider",
                oninput: on_volume_change,
            }
        }
    }
}

/// Detach the player into its own window
#[component]
pub(super) fn PopoutButton(disabled: bool) -> Element {
    let handle = use_context::<SessionHandle>().0;

    rsx! {
        button {
            id: "popout-btn",
            r#type: "button",
            disabled,
            class: "popout-btn",
            title: "Open the mini player",
            onclick: move |_| {
                if let Some(handle) = &handle {
                    handle.open_popout();
                }
            },
            Icon { name: "popout".to_string(), class: "popout-btn-icon".to_string() }
        }
    }
}

#[component]
pub(super) fn StatusBadge(role: Role) -> Element {
    let state = use_context::<PlaybackSignal>().0();
    let dot_class = if state.is_playing {
        "status-dot status-dot--on"
    } else {
        "status-dot"
    };
    // Only the page that handed its audio away is detached.
    let text = if role == Role::Primary && state.is_popup_active {
        "DETACHED"
    } else {
        "LIVE"
    };

    rsx! {
        div { class: "status",
            span { class: "{dot_class}" }
            span { class: "status-text", "{text}" }
        }
    }
}
