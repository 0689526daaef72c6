use gloo_timers::callback::{Interval, Timeout};
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use panel_core::{
    CameraClient, MessageToken, Outcome, Panel, PanelError, ParamValue, ParameterKey,
    ParameterSpec, PresetReport, PullReport, PushReport, StreamHealthMonitor,
    StreamStatusResponse, ValueKind, STATUS_DISMISS_MS, STREAM_POLL_MS,
};

/// Preset names offered by the deployed server. Opaque to the client; the
/// server decides what each one changes.
const PRESETS: &[&str] = &["default", "low_light", "fast_motion", "high_detail"];

#[derive(Properties, PartialEq)]
pub struct CameraPanelProps {
    /// Base URL of the camera server; empty means same origin.
    #[prop_or_default]
    pub server: String,
}

pub struct CameraPanel {
    panel: Option<Panel>,
    connect_failed: bool,
    disabled: Vec<&'static str>,
    monitor: StreamHealthMonitor,
    stream_poll_handle: Option<Interval>,
    video_url: String,
}

pub enum Msg {
    Connected(Box<Panel>),
    ConnectFailed,
    Edit(ParameterKey, ParamValue),
    Pushed(PushReport),
    Pulled(PullReport),
    ApplyPreset(&'static str),
    Refresh,
    Reset,
    PresetDone(PresetReport),
    PollStream,
    StreamPolled(Result<StreamStatusResponse, PanelError>),
    DismissStatus(MessageToken),
    Shutdown,
}

impl Component for CameraPanel {
    type Message = Msg;
    type Properties = CameraPanelProps;

    fn create(ctx: &Context<Self>) -> Self {
        let client = CameraClient::new(&ctx.props().server);
        let video_url = client.video_feed_url();

        let link = ctx.link().clone();
        spawn_local(async move {
            match Panel::connect(client).await {
                Ok(panel) => link.send_message(Msg::Connected(Box::new(panel))),
                Err(err) => {
                    web_sys::console::error_1(&format!("camera connect failed: {err}").into());
                    link.send_message(Msg::ConnectFailed);
                }
            }
        });

        let poll_link = ctx.link().clone();
        let handle = Interval::new(STREAM_POLL_MS, move || {
            poll_link.send_message(Msg::PollStream);
        });

        Self {
            panel: None,
            connect_failed: false,
            disabled: Vec::new(),
            monitor: StreamHealthMonitor::new(),
            stream_poll_handle: Some(handle),
            video_url,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Connected(panel) => {
                self.disabled = panel.disabled_controls();
                self.panel = Some(*panel);
                true
            }
            Msg::ConnectFailed => {
                self.connect_failed = true;
                true
            }
            Msg::Edit(key, value) => {
                if let Some(panel) = self.panel.clone() {
                    let link = ctx.link().clone();
                    spawn_local(async move {
                        let report = panel.push(key, value).await;
                        link.send_message(Msg::Pushed(report));
                    });
                }
                false
            }
            Msg::Pushed(report) => {
                self.schedule_dismiss(ctx, report.message);
                true
            }
            Msg::Pulled(report) => {
                if report.refreshed {
                    self.disabled = report.disabled_controls;
                }
                self.schedule_dismiss(ctx, report.message);
                true
            }
            Msg::ApplyPreset(name) => {
                if let Some(panel) = self.panel.clone() {
                    let link = ctx.link().clone();
                    spawn_local(async move {
                        let report = panel.apply_preset(name).await;
                        link.send_message(Msg::PresetDone(report));
                    });
                }
                false
            }
            Msg::Refresh => {
                if let Some(panel) = self.panel.clone() {
                    let link = ctx.link().clone();
                    spawn_local(async move {
                        let report = panel.pull().await;
                        link.send_message(Msg::Pulled(report));
                    });
                }
                false
            }
            Msg::Reset => {
                if let Some(panel) = self.panel.clone() {
                    let link = ctx.link().clone();
                    spawn_local(async move {
                        let report = panel.reset().await;
                        link.send_message(Msg::PresetDone(report));
                    });
                }
                false
            }
            Msg::PresetDone(report) => {
                if report.resynced {
                    self.disabled = report.disabled_controls;
                }
                self.schedule_dismiss(ctx, report.message);
                true
            }
            Msg::PollStream => {
                if let Some(panel) = &self.panel {
                    let client = panel.client().clone();
                    let link = ctx.link().clone();
                    spawn_local(async move {
                        link.send_message(Msg::StreamPolled(client.stream_status().await));
                    });
                }
                false
            }
            Msg::StreamPolled(result) => {
                let was_visible = self.monitor.alert_visible();
                let visible = self.monitor.observe(result);
                if was_visible && !visible {
                    // Stream came back; force the <img> to reconnect.
                    if let Some(panel) = &self.panel {
                        self.video_url =
                            format!("{}?t={}", panel.client().video_feed_url(), js_sys::Date::now());
                    }
                }
                was_visible != visible
            }
            Msg::DismissStatus(token) => match &self.panel {
                Some(panel) => panel.messenger().dismiss(token),
                None => false,
            },
            Msg::Shutdown => {
                let confirmed = web_sys::window()
                    .and_then(|w| w.confirm_with_message("Shut down the camera server?").ok())
                    .unwrap_or(false);
                if confirmed {
                    if let Some(panel) = &self.panel {
                        let client = panel.client().clone();
                        spawn_local(async move {
                            if let Err(err) = client.shutdown().await {
                                web_sys::console::error_1(
                                    &format!("shutdown request failed: {err}").into(),
                                );
                            }
                        });
                    }
                }
                false
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let panel = match &self.panel {
            Some(panel) => panel,
            None if self.connect_failed => {
                return html! {
                    <div class="connect-error">
                        {"Could not reach the camera server. Reload the page to retry."}
                    </div>
                }
            }
            None => return html! { <div class="connecting">{"Connecting to camera..."}</div> },
        };

        html! {
            <>
                <div class="column left-panel">
                    <h2>{"Camera Settings"}</h2>
                    { for panel.registry().specs().iter().map(|spec| self.view_control(ctx, panel, spec)) }
                </div>

                <div class="column center-panel">
                    { self.view_status(panel) }
                    <div class="image-container">
                        if self.monitor.alert_visible() {
                            <div class="stream-alert">{"Video stream is not running"}</div>
                        }
                        <img
                            class="image-frame"
                            src={self.video_url.clone()}
                            alt="Live camera stream"
                        />
                    </div>
                </div>

                <div class="column right-panel">
                    <h2>{"Presets"}</h2>
                    { for PRESETS.iter().map(|&name| {
                        let onclick = ctx.link().callback(move |_| Msg::ApplyPreset(name));
                        html! {
                            <button class="preset-button" {onclick}>{name.replace('_', " ")}</button>
                        }
                    }) }

                    <h2 style="margin-top: 30px;">{"Maintenance"}</h2>
                    <button
                        class="refresh-button"
                        onclick={ctx.link().callback(|_| Msg::Refresh)}
                    >
                        {"Refresh Settings"}
                    </button>
                    <button
                        class="reset-button"
                        onclick={ctx.link().callback(|_| Msg::Reset)}
                    >
                        {"Reset to Defaults"}
                    </button>
                    <button
                        class="shutdown-button"
                        onclick={ctx.link().callback(|_| Msg::Shutdown)}
                    >
                        {"Shut Down Server"}
                    </button>
                </div>
            </>
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.stream_poll_handle = None;
        if let Some(panel) = &self.panel {
            panel.teardown();
        }
    }
}

impl CameraPanel {
    fn schedule_dismiss(&self, ctx: &Context<Self>, token: Option<MessageToken>) {
        if let Some(token) = token {
            let link = ctx.link().clone();
            Timeout::new(STATUS_DISMISS_MS, move || {
                link.send_message(Msg::DismissStatus(token));
            })
            .forget();
        }
    }

    fn view_status(&self, panel: &Panel) -> Html {
        match panel.messenger().current() {
            Some(message) => {
                let class = match message.outcome {
                    Outcome::Success => "status-message success",
                    Outcome::Error => "status-message error",
                };
                html! { <div class={class}>{message.text}</div> }
            }
            None => html! {},
        }
    }

    fn view_control(&self, ctx: &Context<Self>, panel: &Panel, spec: &ParameterSpec) -> Html {
        let key = spec.key;
        let disabled = self.disabled.contains(&spec.control_id);
        let value = panel.store().get(key);

        let control = match spec.kind {
            ValueKind::Numeric => {
                let onchange = ctx.link().batch_callback(move |e: Event| {
                    let target: HtmlInputElement = e.target_unchecked_into();
                    target
                        .value()
                        .parse()
                        .ok()
                        .map(|n| Msg::Edit(key, ParamValue::Number(n)))
                });
                html! {
                    <input
                        id={spec.control_id}
                        type="number"
                        step="any"
                        disabled={disabled}
                        value={value
                            .and_then(ParamValue::as_number)
                            .map(|n| n.to_string())
                            .unwrap_or_default()}
                        {onchange}
                    />
                }
            }
            ValueKind::Boolean => {
                let onchange = ctx.link().callback(move |e: Event| {
                    let target: HtmlInputElement = e.target_unchecked_into();
                    Msg::Edit(key, ParamValue::Bool(target.checked()))
                });
                html! {
                    <input
                        id={spec.control_id}
                        type="checkbox"
                        disabled={disabled}
                        checked={value.and_then(ParamValue::as_bool).unwrap_or(false)}
                        {onchange}
                    />
                }
            }
            ValueKind::Enum => {
                let onchange = ctx.link().batch_callback(move |e: Event| {
                    let target: HtmlSelectElement = e.target_unchecked_into();
                    target
                        .value()
                        .parse::<i64>()
                        .ok()
                        .map(|v| Msg::Edit(key, ParamValue::Number(v as f64)))
                });
                let current = value.and_then(ParamValue::as_number).map(|n| n as i64);
                html! {
                    <select id={spec.control_id} disabled={disabled} {onchange}>
                        { for spec.options.iter().map(|opt| html! {
                            <option
                                value={opt.value.to_string()}
                                selected={current == Some(opt.value)}
                            >
                                {opt.label}
                            </option>
                        }) }
                    </select>
                }
            }
        };

        html! {
            <div class="control-group">
                <label class="control-label" for={spec.control_id}>{spec.label}</label>
                {control}
            </div>
        }
    }
}
