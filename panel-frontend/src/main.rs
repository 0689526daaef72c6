use panel_frontend::CameraPanel;
use yew::prelude::*;

#[function_component(App)]
fn app() -> Html {
    let window = web_sys::window().expect("no global `window` exists");
    let document = window.document().expect("should have a document on window");

    // Empty base URL means same-origin requests.
    let server = document
        .get_element_by_id("app")
        .and_then(|el| el.get_attribute("data-server"))
        .unwrap_or_default();

    html! {
        <CameraPanel {server} />
    }
}

fn main() {
    yew::Renderer::<App>::new().render();
}
