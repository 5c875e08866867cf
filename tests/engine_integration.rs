//! End-to-end coverage over [`modbus_client::transport::mock::MockTransport`],
//! covering exception handling, broadcast writes, FC43 continuation, RTU reassembly, and timeouts.

use std::time::Duration;

use modbus_client::transport::mock::MockTransport;
use modbus_client::transport::Framing;
use modbus_client::{Engine, EngineConfig, ExceptionCode, FunctionCode, RegisterValues, ResponseKind, TransactionError};

fn engine(unit_id: u8) -> (Engine<MockTransport>, modbus_client::transport::mock::MockHandle) {
    let (transport, handle) = MockTransport::pair(Framing::Buffered);
    let engine = Engine::new(
        transport,
        EngineConfig {
            unit_id,
            timeout: Duration::from_millis(100),
            ..Default::default()
        },
    );
    (engine, handle)
}

#[tokio::test]
async fn reads_two_holding_registers_over_the_wire() {
    let (mut eng, mut handle) = engine(17);
    eng.open().await.unwrap();

    let call = tokio::spawn(async move { eng.read_holding_registers(0x006B, 2).await });
    assert_eq!(
        handle.next_written().await.unwrap(),
        vec![0x11, 0x03, 0x00, 0x6B, 0x00, 0x02, 0x76, 0x87]
    );
    handle.push_inbound(vec![0x11, 0x03, 0x04, 0xAE, 0x41, 0x56, 0x52, 0x49, 0xAD]);

    let response = call.await.unwrap().unwrap();
    assert_eq!(
        response.kind,
        ResponseKind::ReadRegisters(RegisterValues::Narrow(vec![0xAE41, 0x5652]))
    );
}

#[tokio::test]
async fn exception_response_surfaces_illegal_data_address() {
    let (mut eng, mut handle) = engine(17);
    eng.open().await.unwrap();

    let call = tokio::spawn(async move { eng.read_coils(0x0013, 0x25).await });
    assert_eq!(
        handle.next_written().await.unwrap(),
        vec![0x11, 0x01, 0x00, 0x13, 0x00, 0x25, 0x0E, 0x84]
    );
    handle.push_inbound(vec![0x11, 0x81, 0x02, 0xC1, 0x91]);

    let err = call.await.unwrap().unwrap_err();
    match err {
        modbus_client::EngineError::Transaction(TransactionError::Exception { code, .. }) => {
            assert_eq!(code, ExceptionCode::IllegalDataAddress);
        }
        other => panic!("expected exception, got {other:?}"),
    }
}

#[tokio::test]
async fn broadcast_write_fires_immediately() {
    let (mut eng, mut handle) = engine(0);
    eng.open().await.unwrap();

    // No bytes are ever pushed; if the engine armed a timeout waiting for
    // a response this call would hang past the 100ms configured above.
    let response = tokio::time::timeout(Duration::from_millis(50), eng.write_coil(0x00AC, true))
        .await
        .expect("broadcast write must not wait for a response")
        .unwrap();

    assert_eq!(
        response.kind,
        ResponseKind::WriteCoil {
            addr: 0x00AC,
            value: true
        }
    );
    let written = handle.try_next_written().unwrap();
    assert_eq!(written[0], 0x00);
    assert_eq!(written[1], FunctionCode::WriteSingleCoil.code());
}

#[tokio::test]
async fn fc43_continuation_merges_pages() {
    let (mut eng, mut handle) = engine(17);
    eng.open().await.unwrap();

    let call = tokio::spawn(async move { eng.read_device_identification(0x01).await });

    let _first = handle.next_written().await.unwrap();
    handle.push_inbound(device_id_page(true, 0x02, &[(0x00, "Foo"), (0x01, "Bar")]));

    let _second = handle.next_written().await.unwrap();
    handle.push_inbound(device_id_page(false, 0x00, &[(0x02, "Baz")]));

    let response = call.await.unwrap().unwrap();
    match response.kind {
        ResponseKind::ReadDeviceIdentification { objects, .. } => {
            assert_eq!(objects.len(), 3);
            assert_eq!(objects[&0], "Foo");
            assert_eq!(objects[&1], "Bar");
            assert_eq!(objects[&2], "Baz");
        }
        other => panic!("expected ReadDeviceIdentification, got {other:?}"),
    }
}

fn device_id_page(more_follows: bool, next_object_id: u8, objects: &[(u8, &str)]) -> Vec<u8> {
    let mut frame = vec![0x11, 0x2B, 0x0E, 0x01, 0x01, more_follows as u8, next_object_id];
    frame.push(objects.len() as u8);
    for (id, value) in objects {
        frame.push(*id);
        frame.push(value.len() as u8);
        frame.extend_from_slice(value.as_bytes());
    }
    modbus_client::protocol::crc::append_crc(&mut frame);
    frame
}

#[tokio::test]
async fn reassembles_past_leading_garbage() {
    let (mut eng, mut handle) = engine(17);
    eng.open().await.unwrap();

    let call = tokio::spawn(async move { eng.read_holding_registers(0x006B, 2).await });
    let _request = handle.next_written().await.unwrap();
    handle.push_inbound(vec![
        0xFF, 0xFF, 0x11, 0x03, 0x04, 0xAE, 0x41, 0x56, 0x52, 0x49, 0xAD,
    ]);

    let response = call.await.unwrap().unwrap();
    assert_eq!(
        response.kind,
        ResponseKind::ReadRegisters(RegisterValues::Narrow(vec![0xAE41, 0x5652]))
    );
}

#[tokio::test(start_paused = true)]
async fn timeout_then_late_fragment_is_dropped() {
    let (mut eng, mut handle) = engine(17);
    eng.open().await.unwrap();

    eng.set_timeout(Duration::from_millis(100));
    let err = eng.read_holding_registers(0x006B, 2).await.unwrap_err();
    assert!(matches!(
        err,
        modbus_client::EngineError::Transaction(TransactionError::TimedOut { .. })
    ));

    // A late fragment matching the header the engine was looking for
    // must not resurrect the already-failed transaction: the next
    // submission starts its own fresh wait instead.
    handle.push_inbound(vec![0x11, 0x03, 0x04, 0xAE, 0x41, 0x56, 0x52, 0x49, 0xAD]);

    let call = tokio::spawn(async move { eng.read_holding_registers(0x006B, 2).await });
    let _request = handle.next_written().await.unwrap();
    let response = call.await.unwrap().unwrap();
    assert_eq!(
        response.kind,
        ResponseKind::ReadRegisters(RegisterValues::Narrow(vec![0xAE41, 0x5652]))
    );
}
