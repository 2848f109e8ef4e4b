use gpu_bridge::{
    BufferOptions, Config, Device, Error, Handle, HandleKind, Heap, QueueOptions, Registry,
    ResultCode,
};

fn registry() -> Registry {
    let _ = env_logger::builder().is_test(true).try_init();
    Registry::new(Config::host())
}

fn queue_options(device: Device, count: u32) -> QueueOptions {
    QueueOptions {
        device,
        max_command_buffer_count: count,
    }
}

#[test]
fn full_lifecycle() {
    let registry = registry();

    let device = registry.init_device().unwrap();
    assert!(!device.is_null());
    assert_eq!(registry.kind_of(device), Some(HandleKind::Device));
    assert!(!registry.device_name(device).unwrap().is_empty());

    let queue = registry.init_queue(&queue_options(device, 3)).unwrap();
    assert_eq!(registry.queue_max_command_buffer_count(queue).unwrap(), 3);
    registry.submit_marker(queue).unwrap();
    registry.wait_queue_idle(queue).unwrap();

    let storage = registry
        .init_storage_buffer(&BufferOptions::new(device, 256))
        .unwrap();
    assert_eq!(registry.buffer_size(storage).unwrap(), 256);
    assert_eq!(registry.buffer_heap(storage).unwrap(), Heap::Private);

    let upload = registry
        .init_upload_buffer(&[9, 8, 7, 6], &BufferOptions::new(device, 4))
        .unwrap();
    assert_eq!(registry.buffer_heap(upload).unwrap(), Heap::Shared);
    assert_eq!(registry.read_buffer(upload, 0, 4).unwrap(), vec![9, 8, 7, 6]);

    assert_eq!(registry.live_handles(), 4);
    registry.release(upload);
    registry.release(storage);
    registry.release(queue);
    registry.release(device);
    assert_eq!(registry.live_handles(), 0);
}

#[test]
fn successful_handles_are_never_null_and_distinct() {
    let registry = registry();
    let device = registry.init_device().unwrap();
    let queue = registry.init_queue(&queue_options(device, 1)).unwrap();
    let buffer = registry
        .init_storage_buffer(&BufferOptions::new(device, 1))
        .unwrap();

    let handles: Vec<Handle> = vec![device.into(), queue.into(), buffer.into()];
    for handle in &handles {
        assert_ne!(*handle, Handle::NULL);
    }
    assert_ne!(handles[0], handles[1]);
    assert_ne!(handles[1], handles[2]);
    assert_ne!(handles[0], handles[2]);
}

#[test]
fn upload_heap_mismatch_has_its_own_code() {
    let registry = registry();
    let device = registry.init_device().unwrap();

    let result = registry.init_upload_buffer(
        &[0; 8],
        &BufferOptions::new(device, 8).with_heap(Heap::Private),
    );
    assert!(matches!(
        result,
        Err(Error::InvalidHeapForBufferWithBytes { heap: Heap::Private })
    ));
    assert_eq!(
        ResultCode::from(&result),
        ResultCode::InvalidHeapForBufferWithBytes
    );
}

#[test]
fn heap_mismatch_wins_over_other_problems() {
    let registry = registry();
    // Bad device and wrong byte count, but the heap is checked first
    let options = BufferOptions::new(Device::NULL, 8).with_heap(Heap::Private);
    let result = registry.init_upload_buffer(&[1, 2], &options);
    assert_eq!(
        ResultCode::from(&result),
        ResultCode::InvalidHeapForBufferWithBytes
    );
}

#[test]
fn readback_heap_accepts_bytes() {
    let registry = registry();
    let device = registry.init_device().unwrap();
    let buffer = registry
        .init_upload_buffer(
            b"hello",
            &BufferOptions::new(device, 5).with_heap(Heap::Readback),
        )
        .unwrap();
    assert_eq!(registry.read_buffer(buffer, 1, 3).unwrap(), b"ell".to_vec());
}

#[test]
fn other_failures_are_unknown() {
    let registry = registry();
    let device = registry.init_device().unwrap();

    let zero = registry.init_storage_buffer(&BufferOptions::new(device, 0));
    assert!(matches!(zero, Err(Error::ZeroSizedBuffer)));
    assert_eq!(ResultCode::from(&zero), ResultCode::Unknown);

    let mismatch = registry.init_upload_buffer(&[1, 2, 3], &BufferOptions::new(device, 4));
    assert!(matches!(mismatch, Err(Error::ByteCountMismatch { expected: 4, actual: 3 })));
    assert_eq!(ResultCode::from(&mismatch), ResultCode::Unknown);

    let no_device = registry.init_queue(&queue_options(Device::NULL, 2));
    assert!(matches!(no_device, Err(Error::InvalidHandle(_))));
    assert_eq!(ResultCode::from(&no_device), ResultCode::Unknown);

    let zero_queue = registry.init_queue(&queue_options(device, 0));
    assert_eq!(ResultCode::from(&zero_queue), ResultCode::Unknown);
}

#[test]
fn released_handles_are_rejected() {
    let registry = registry();
    let device = registry.init_device().unwrap();
    registry.release(device);

    let result = registry.init_storage_buffer(&BufferOptions::new(device, 16));
    assert!(matches!(result, Err(Error::InvalidHandle(handle)) if handle == device.handle()));
}

#[test]
fn double_release_is_ignored() {
    let registry = registry();
    let device = registry.init_device().unwrap();
    let other = registry.init_device().unwrap();

    registry.release(device);
    registry.release(device);
    registry.release(Handle::NULL);

    assert_eq!(registry.kind_of(other), Some(HandleKind::Device));
    assert_eq!(registry.live_handles(), 1);
}

#[test]
fn wrong_handle_kind_is_rejected() {
    let registry = registry();
    let device = registry.init_device().unwrap();
    let queue = registry.init_queue(&queue_options(device, 1)).unwrap();

    // A queue handle passed where a device is expected
    let result = registry.init_storage_buffer(&BufferOptions::new(
        Device::from_handle(queue.handle()),
        4,
    ));
    assert!(matches!(
        result,
        Err(Error::WrongHandleKind {
            expected: HandleKind::Device,
            actual: HandleKind::Queue,
            ..
        })
    ));
}

#[test]
fn private_buffers_refuse_host_access() {
    let registry = registry();
    let device = registry.init_device().unwrap();
    let buffer = registry
        .init_storage_buffer(&BufferOptions::new(device, 8))
        .unwrap();

    assert!(matches!(
        registry.read_buffer(buffer, 0, 8),
        Err(Error::NotHostVisible)
    ));
    assert!(matches!(
        registry.write_buffer(buffer, 0, &[1]),
        Err(Error::NotHostVisible)
    ));
}

#[test]
fn shared_storage_buffer_can_be_written_and_read() {
    let registry = registry();
    let device = registry.init_device().unwrap();
    let buffer = registry
        .init_storage_buffer(&BufferOptions::new(device, 8).with_heap(Heap::Shared))
        .unwrap();

    registry.write_buffer(buffer, 4, &[1, 2, 3, 4]).unwrap();
    assert_eq!(
        registry.read_buffer(buffer, 0, 8).unwrap(),
        vec![0, 0, 0, 0, 1, 2, 3, 4]
    );
    assert!(matches!(
        registry.write_buffer(buffer, 6, &[1, 2, 3]),
        Err(Error::OutOfBounds { offset: 6, len: 3, size: 8 })
    ));
}

#[test]
fn registry_is_shareable_across_threads() {
    let registry = std::sync::Arc::new(registry());
    let device = registry.init_device().unwrap();

    let workers: Vec<_> = (0..4u8)
        .map(|i| {
            let registry = registry.clone();
            std::thread::spawn(move || {
                let buffer = registry
                    .init_upload_buffer(&[i; 32], &BufferOptions::new(device, 32))
                    .unwrap();
                let contents = registry.read_buffer(buffer, 0, 32).unwrap();
                registry.release(buffer);
                contents
            })
        })
        .collect();

    for (i, worker) in workers.into_iter().enumerate() {
        assert_eq!(worker.join().unwrap(), vec![i as u8; 32]);
    }
    assert_eq!(registry.live_handles(), 1);
}
