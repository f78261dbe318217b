//! Reader loop tests over scripted byte streams.

use std::time::Duration;
use teleinfo_rs::teleinfo::line::encode_line;
use teleinfo_rs::teleinfo::serial_mock::MockSerialPort;
use teleinfo_rs::{
    FieldValue, MemorySink, ReaderConfig, SerialLineSource, SinkHandle, TeleinfoReader,
};
use tokio::sync::oneshot;

fn meter_frame(papp: &str) -> Vec<u8> {
    let mut bytes = vec![0x03, 0x02, b'\n'];
    bytes.extend(encode_line("ADCO", "031428097115"));
    bytes.extend(encode_line("OPTARIF", "BASE"));
    bytes.extend(encode_line("PAPP", papp));
    bytes
}

/// Chunks of the stream cut lines at arbitrary places, as a serial driver
/// does; lines are rebuilt before decoding.
#[tokio::test]
async fn test_lines_split_across_reads() {
    let mut stream = meter_frame("00420");
    stream.extend(meter_frame("00430"));
    stream.extend(b"\x03\x02\n");

    let mut builder = tokio_test::io::Builder::new();
    for chunk in stream.chunks(7) {
        builder.read(chunk);
    }
    let source = SerialLineSource::new(builder.build(), Duration::from_secs(1));

    let sink = MemorySink::new();
    let handle = SinkHandle::spawn(sink.clone(), 8);
    let (_stop, shutdown) = oneshot::channel();
    let mut reader = TeleinfoReader::new(source, ReaderConfig::default());
    let stats = reader.run(&handle, shutdown).await.unwrap();
    let sink_stats = handle.close().await.unwrap();

    assert_eq!(stats.frames_forwarded, 2);
    assert_eq!(sink_stats.written, 2);
    assert_eq!(stats.assembler.lines_rejected(), 0);

    let frames = sink.frames();
    assert_eq!(frames[0].get("PAPP"), Some(&FieldValue::Integer(420)));
    assert_eq!(frames[1].get("PAPP"), Some(&FieldValue::Integer(430)));
    assert!(frames.iter().all(|f| !f.contains_key("ADCO")));
    assert_eq!(
        reader.assembler().meter_address(),
        Some(&FieldValue::Integer(31428097115))
    );
}

/// A sink that fails does not stop the capture.
#[tokio::test]
async fn test_failing_sink_does_not_stop_reader() {
    let mock = MockSerialPort::new();
    for iinst in ["001", "002", "003"] {
        mock.queue_frame(&[("IINST", iinst)]);
    }
    mock.queue_rx_data(b"\x02\n");
    mock.close();

    let sink = MemorySink::new();
    sink.set_failing(true);
    let handle = SinkHandle::spawn(sink.clone(), 8);
    let (_stop, shutdown) = oneshot::channel();
    let source = SerialLineSource::new(mock, Duration::from_millis(100));
    let stats = TeleinfoReader::new(source, ReaderConfig::default())
        .run(&handle, shutdown)
        .await
        .unwrap();
    let sink_stats = handle.close().await.unwrap();

    assert_eq!(stats.frames_forwarded, 3);
    assert_eq!(sink_stats.failed, 3);
    assert!(sink.frames().is_empty());
}

/// Silence on the line is reported as timeouts, not as end of stream.
#[tokio::test]
async fn test_silent_line_times_out_until_shutdown() {
    let mock = MockSerialPort::new();
    let sink = MemorySink::new();
    let handle = SinkHandle::spawn(sink.clone(), 8);
    let (stop, shutdown) = oneshot::channel();

    let source = SerialLineSource::new(mock.clone(), Duration::from_millis(10));
    let mut reader = TeleinfoReader::new(source, ReaderConfig::default());
    let feeder = async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        mock.queue_frame(&[("PAPP", "01289")]);
        mock.queue_rx_data(b"\x02\n");
        tokio::time::sleep(Duration::from_millis(60)).await;
        let _ = stop.send(());
    };
    let (stats, ()) = tokio::join!(reader.run(&handle, shutdown), feeder);
    handle.close().await.unwrap();

    let stats = stats.unwrap();
    assert!(stats.read_timeouts >= 2);
    assert_eq!(stats.frames_forwarded, 1);
    assert_eq!(sink.frames()[0].get("PAPP"), Some(&FieldValue::Integer(1289)));
}

/// An I/O error from the port ends the run with that error.
#[tokio::test]
async fn test_port_error_is_returned() {
    let mock = MockSerialPort::new();
    mock.queue_frame(&[("IINST", "005")]);
    mock.set_next_error(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "device unplugged",
    ));

    let handle = SinkHandle::spawn(MemorySink::new(), 8);
    let (_stop, shutdown) = oneshot::channel();
    let source = SerialLineSource::new(mock, Duration::from_secs(1));
    let result = TeleinfoReader::new(source, ReaderConfig::default())
        .run(&handle, shutdown)
        .await;
    handle.close().await.unwrap();

    assert!(matches!(result, Err(teleinfo_rs::TeleinfoError::Io(_))));
}
