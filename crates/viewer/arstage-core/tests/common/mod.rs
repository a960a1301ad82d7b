#![allow(dead_code)]
use arstage_core::{
    Config, Coordinator, FrameInput, HostCommand, LoadError, LoadedAsset, Outputs, RequestId,
};

/// `(request, path)` for every `LoadAsset` command in a batch.
pub fn loads(out: &Outputs) -> Vec<(RequestId, String)> {
    out.commands
        .iter()
        .filter_map(|c| match c {
            HostCommand::LoadAsset { request, path } => Some((*request, path.clone())),
            _ => None,
        })
        .collect()
}

pub fn request_for(loads: &[(RequestId, String)], path: &str) -> RequestId {
    loads
        .iter()
        .find(|(_, p)| p == path)
        .map(|(r, _)| *r)
        .unwrap_or_else(|| panic!("no load issued for {path}"))
}

pub fn asset(name: &str) -> LoadedAsset {
    arstage_test_fixtures::assets::load(name).expect("asset fixture")
}

pub fn complete(c: &mut Coordinator, loads: &[(RequestId, String)], path: &str, name: &str) {
    c.on_load_complete(request_for(loads, path), Ok(asset(name)));
}

pub fn fail(c: &mut Coordinator, loads: &[(RequestId, String)], path: &str) {
    c.on_load_complete(request_for(loads, path), Err(LoadError::new(path, "404 Not Found")));
}

pub fn statuses(out: &Outputs) -> Vec<String> {
    out.commands
        .iter()
        .filter_map(|c| match c {
            HostCommand::Status { message } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

pub fn frame() -> FrameInput {
    FrameInput::default()
}

pub fn config(name: &str) -> Config {
    arstage_test_fixtures::configs::load(name).expect("config fixture")
}

/// Coordinator for a fixture config, started, with its initial loads.
pub fn started(name: &str) -> (Coordinator, Vec<(RequestId, String)>) {
    started_with(config(name))
}

pub fn started_with(cfg: Config) -> (Coordinator, Vec<(RequestId, String)>) {
    let mut c = Coordinator::new(cfg).expect("valid config");
    c.start();
    let out = c.take_outputs();
    let issued = loads(&out);
    (c, issued)
}
