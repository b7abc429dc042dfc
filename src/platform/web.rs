// Browser backends: <audio>, BroadcastChannel, window.open and navigator.mediaSession.
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures_channel::mpsc::UnboundedSender;
use futures_util::future::{ready, LocalBoxFuture};
use futures_util::FutureExt;
use gloo_timers::future::TimeoutFuture;
use tracing::{debug, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{window, BroadcastChannel, HtmlAudioElement, MessageEvent};

use crate::player::{
    AudioOutput, Capabilities, ChannelConnector, ChannelTransport, NowPlayingSurface,
    PlaybackError, PopoutRequest, PopoutWindow, SyncError, Timer, TrackMetadata, TransportAction,
    WindowHost,
};

const AUDIO_ELEMENT_ID: &str = "rep-player-audio";

fn describe_js_error(err: &JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    js_sys::Reflect::get(err, &"name".into())
        .ok()
        .and_then(|name| name.as_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

/// Initialize the shared audio element once.
fn get_or_create_audio_element() -> Option<HtmlAudioElement> {
    let document = window()?.document()?;

    if let Some(existing) = document.get_element_by_id(AUDIO_ELEMENT_ID) {
        return existing.dyn_into::<HtmlAudioElement>().ok();
    }

    let audio: HtmlAudioElement = document.create_element("audio").ok()?.dyn_into().ok()?;
    audio.set_id(AUDIO_ELEMENT_ID);
    audio.set_attribute("preload", "none").ok()?;
    audio.set_cross_origin(Some("anonymous"));
    document.body()?.append_child(&audio).ok()?;

    Some(audio)
}

pub struct HtmlAudioOutput {
    element: Option<HtmlAudioElement>,
}

impl HtmlAudioOutput {
    pub fn attach() -> Self {
        let element = get_or_create_audio_element();
        if element.is_none() {
            warn!("could not create the audio element");
        }
        Self { element }
    }
}

impl AudioOutput for HtmlAudioOutput {
    fn set_source(&self, url: &str) {
        if let Some(audio) = &self.element {
            audio.set_src(url);
        }
    }

    fn play(&self) -> LocalBoxFuture<'static, Result<(), PlaybackError>> {
        let Some(audio) = &self.element else {
            return ready(Err(PlaybackError::Unsupported)).boxed_local();
        };
        match audio.play() {
            Ok(promise) => async move {
                wasm_bindgen_futures::JsFuture::from(promise)
                    .await
                    .map(|_| ())
                    .map_err(|err| PlaybackError::Rejected(describe_js_error(&err)))
            }
            .boxed_local(),
            Err(err) => ready(Err(PlaybackError::Rejected(describe_js_error(&err)))).boxed_local(),
        }
    }

    fn pause(&self) {
        if let Some(audio) = &self.element {
            let _ = audio.pause();
        }
    }

    fn set_volume(&self, volume: f64) {
        if let Some(audio) = &self.element {
            audio.set_volume(volume);
        }
    }
}

pub struct BroadcastConnector;

struct BroadcastTransport {
    channel: BroadcastChannel,
    onmessage: RefCell<Option<Closure<dyn FnMut(MessageEvent)>>>,
}

impl ChannelConnector for BroadcastConnector {
    fn connect(
        &self,
        channel_name: &str,
        sink: UnboundedSender<String>,
    ) -> Result<Box<dyn ChannelTransport>, SyncError> {
        let channel = BroadcastChannel::new(channel_name).map_err(|err| SyncError::Join {
            channel: channel_name.to_string(),
            reason: describe_js_error(&err),
        })?;

        let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let data = event.data();
            // Older pages post plain objects rather than text.
            let frame = data.as_string().or_else(|| {
                js_sys::JSON::stringify(&data)
                    .ok()
                    .and_then(|text| text.as_string())
            });
            if let Some(frame) = frame {
                let _ = sink.unbounded_send(frame);
            }
        });
        channel.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

        Ok(Box::new(BroadcastTransport {
            channel,
            onmessage: RefCell::new(Some(onmessage)),
        }))
    }
}

impl ChannelTransport for BroadcastTransport {
    fn post(&self, frame: &str) -> Result<(), SyncError> {
        // Post structured data so pages that read `event.data.type` keep working.
        let value = js_sys::JSON::parse(frame).unwrap_or_else(|_| JsValue::from_str(frame));
        self.channel
            .post_message(&value)
            .map_err(|err| SyncError::Post(describe_js_error(&err)))
    }

    fn close(&self) {
        self.channel.set_onmessage(None);
        self.channel.close();
        // Dropping the closure drops the sink, which ends the inbox stream.
        self.onmessage.borrow_mut().take();
    }
}

pub struct BrowserWindowHost;

struct BrowserPopout(web_sys::Window);

impl PopoutWindow for BrowserPopout {
    fn is_closed(&self) -> bool {
        self.0.closed().unwrap_or(true)
    }

    fn focus(&self) {
        let _ = self.0.focus();
    }
}

impl WindowHost for BrowserWindowHost {
    fn screen_size(&self) -> Option<(f64, f64)> {
        let screen = window()?.screen().ok()?;
        Some((f64::from(screen.width().ok()?), f64::from(screen.height().ok()?)))
    }

    fn open(&self, request: &PopoutRequest) -> Option<Box<dyn PopoutWindow>> {
        let handle = window()?
            .open_with_url_and_target_and_features(&request.url, &request.name, &request.features)
            .ok()??;
        Some(Box::new(BrowserPopout(handle)))
    }
}

/// `navigator.mediaSession`, reached through reflection so browsers without it
/// simply report no surface.
pub struct BrowserMediaSession {
    session: JsValue,
    handlers: RefCell<Vec<Closure<dyn FnMut()>>>,
}

impl BrowserMediaSession {
    pub fn detect() -> Option<Rc<Self>> {
        let navigator = window()?.navigator();
        let session = js_sys::Reflect::get(&navigator, &"mediaSession".into()).ok()?;
        if session.is_undefined() || session.is_null() {
            debug!("media session unavailable");
            return None;
        }
        Some(Rc::new(Self {
            session,
            handlers: RefCell::new(Vec::new()),
        }))
    }
}

impl NowPlayingSurface for BrowserMediaSession {
    fn set_metadata(&self, metadata: &TrackMetadata) {
        let Ok(init) = serde_json::to_string(metadata)
            .map_err(|err| err.to_string())
            .and_then(|text| js_sys::JSON::parse(&text).map_err(|err| describe_js_error(&err)))
        else {
            return;
        };
        let Ok(constructor) = js_sys::Reflect::get(&js_sys::global(), &"MediaMetadata".into())
            .and_then(|value| value.dyn_into::<js_sys::Function>().map_err(JsValue::from))
        else {
            return;
        };
        match js_sys::Reflect::construct(&constructor, &js_sys::Array::of1(&init)) {
            Ok(value) => {
                let _ = js_sys::Reflect::set(&self.session, &"metadata".into(), &value);
            }
            Err(err) => warn!(reason = %describe_js_error(&err), "failed to build media metadata"),
        }
    }

    fn set_playback_state(&self, playing: bool) {
        let state = if playing { "playing" } else { "paused" };
        let _ = js_sys::Reflect::set(&self.session, &"playbackState".into(), &state.into());
    }

    fn set_action_handler(&self, action: TransportAction, handler: Rc<dyn Fn()>) {
        let Ok(register) = js_sys::Reflect::get(&self.session, &"setActionHandler".into())
            .and_then(|value| value.dyn_into::<js_sys::Function>().map_err(JsValue::from))
        else {
            return;
        };
        let callback = Closure::<dyn FnMut()>::new(move || handler());
        if let Err(err) = register.call2(
            &self.session,
            &JsValue::from_str(action.as_str()),
            callback.as_ref(),
        ) {
            warn!(action = action.as_str(), reason = %describe_js_error(&err), "media session rejected handler");
            return;
        }
        self.handlers.borrow_mut().push(callback);
    }
}

pub struct GlooTimer;

impl Timer for GlooTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        TimeoutFuture::new(millis).boxed_local()
    }
}

pub fn connector() -> BroadcastConnector {
    BroadcastConnector
}

pub fn capabilities() -> Capabilities {
    Capabilities {
        audio: Box::new(HtmlAudioOutput::attach()),
        now_playing: BrowserMediaSession::detect()
            .map(|session| session as Rc<dyn NowPlayingSurface>),
        windows: Some(Box::new(BrowserWindowHost)),
        timer: timer(),
        base_url: base_url(),
    }
}

pub fn timer() -> Rc<dyn Timer> {
    Rc::new(GlooTimer)
}

pub fn launch_query() -> String {
    window()
        .and_then(|w| w.location().search().ok())
        .unwrap_or_default()
}

pub fn page_origin() -> Option<String> {
    window().and_then(|w| w.location().origin().ok())
}

fn base_url() -> String {
    let Some(location) = window().map(|w| w.location()) else {
        return String::new();
    };
    let origin = location.origin().unwrap_or_default();
    let path = location.pathname().unwrap_or_default();
    format!("{origin}{path}")
}

/// Run `callback` when the page is being torn down.
pub fn on_page_hide(callback: impl Fn() + 'static) {
    let Some(window) = window() else {
        return;
    };
    let listener = Closure::<dyn FnMut()>::new(move || callback());
    if window
        .add_event_listener_with_callback("pagehide", listener.as_ref().unchecked_ref())
        .is_ok()
    {
        listener.forget();
    }
}
