//! FC43 (Read Device Identification) continuation driver. A device may
//! answer with `more_follows == 1` and a `next_object_id` telling the
//! caller where to resume; a full read requires reissuing the request
//! until the device says it's done or stops returning new objects.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::protocol::{decode, DebugInfo, Request, Response, ResponseKind};
use crate::transaction::Engine;
use crate::transport::Transport;

/// Bounds the number of follow-up pages fetched for one call, guarding
/// against a misbehaving device that never clears `more_follows`.
const MAX_PAGES: usize = 64;

pub(crate) async fn read_device_identification<T: Transport>(
    engine: &mut Engine<T>,
    device_id_code: u8,
) -> Result<Response, EngineError<T::Error>> {
    let mut object_id = 0u8;
    let mut objects = HashMap::new();
    let mut conformity_level = 0u8;
    let mut debug: Option<DebugInfo> = None;
    let unit_id = engine.unit_id();

    let mut pages = 0;
    loop {
        pages += 1;
        if pages > MAX_PAGES {
            break;
        }

        let request = Request::ReadDeviceIdentification {
            device_id_code,
            object_id,
        };
        let rt = engine
            .transact(&request)
            .await?
            .expect("FC43 never broadcasts: unit id 0 is rejected at encode time");

        decode::validate_common(&rt.frame, unit_id, rt.function, rt.expected_length)?;
        let page = decode::decode_device_id_page(&rt.frame)?;

        conformity_level = page.conformity_level;
        let page_had_objects = !page.objects.is_empty();
        objects.extend(page.objects);

        match (&mut debug, rt.debug) {
            (None, new) => debug = new,
            (Some(acc), Some(new)) => acc.responses.extend(new.responses),
            (Some(_), None) => {}
        }

        if !page.more_follows || !page_had_objects {
            break;
        }
        object_id = page.next_object_id;
    }

    Ok(Response::new(
        ResponseKind::ReadDeviceIdentification {
            objects,
            conformity_level,
        },
        debug,
    ))
}
