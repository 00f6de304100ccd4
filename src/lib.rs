//! Client-side data layer for the Portcall travel-guide frontend: the API
//! gateway client, the query cache, the admin prefetcher, the trip-update
//! tracker and the service-worker update controller. Views consume this
//! crate through the `state` hooks; nothing here renders.

pub mod api;
pub mod cache;
pub mod config;
pub mod state;
pub mod utils;

/// Wires the data layer into the browser runtime. Mounting the view tree is
/// the host shell's job and happens after this returns.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    log::info!("Starting Portcall data layer (wasm)");

    // Kick off runtime config load from ./config.json (non-blocking).
    // If window.__PORTCALL_ENV is present (env.js), it takes precedence.
    wasm_bindgen_futures::spawn_local(async move {
        config::init().await;
        log::info!("Runtime config initialized");
    });
}
