#![no_main]

use hop_core::{Connection, DispatchAction, DispatchConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut conn = Connection::new(&DispatchConfig::default());
    let mut opened = false;

    for chunk in data.chunks(13) {
        let actions = match conn.handle(chunk) {
            Ok(actions) => actions,
            Err(_) => break,
        };
        if !opened
            && actions
                .iter()
                .any(|action| matches!(action, DispatchAction::OpenDownstream(_)))
        {
            opened = true;
            let _ = conn.downstream_opened();
        }
    }
});
