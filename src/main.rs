use dioxus::prelude::*;

mod components;

use components::AppShell;

const PLAYER_CSS: Asset = asset!("/assets/styling/player.css");

fn main() {
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    rsx! {
        document::Title { "Radio Electro Paris" }
        document::Meta { name: "theme-color", content: "#000000" }
        document::Meta { name: "apple-mobile-web-app-title", content: "REP Player" }
        document::Stylesheet { href: PLAYER_CSS }

        AppShell {}
    }
}
