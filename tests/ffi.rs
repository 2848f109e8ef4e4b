use gpu_bridge::ffi::{
    gpu_init_device, gpu_init_queue, gpu_init_storage_buffer, gpu_init_upload_buffer,
    gpu_read_buffer, gpu_release, install_registry, registry, GpuBufferOptions, GpuQueueOptions,
};
use gpu_bridge::{Config, Handle, HandleKind, Heap, Registry, ResultCode};
use std::os::raw::c_void;
use std::ptr;

fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = install_registry(Registry::new(Config::host()));
}

fn device() -> Handle {
    let mut device = Handle::NULL;
    assert_eq!(unsafe { gpu_init_device(&mut device) }, ResultCode::Ok);
    assert!(!device.is_null());
    device
}

#[test]
fn c_lifecycle() {
    setup();
    let device = device();

    let mut queue = Handle::NULL;
    let queue_options = GpuQueueOptions {
        device,
        max_command_buffer_count: 2,
    };
    assert_eq!(
        unsafe { gpu_init_queue(&mut queue, &queue_options) },
        ResultCode::Ok
    );
    assert_eq!(registry().kind_of(queue), Some(HandleKind::Queue));

    // Zeroed heap field behaves like the private default
    let mut storage = Handle::NULL;
    let storage_options = GpuBufferOptions {
        device,
        size: 64,
        heap: 0,
    };
    assert_eq!(
        unsafe { gpu_init_storage_buffer(&mut storage, &storage_options) },
        ResultCode::Ok
    );

    let bytes = [1u8, 2, 3, 4, 5, 6, 7, 8];
    let mut upload = Handle::NULL;
    let upload_options = GpuBufferOptions {
        device,
        size: bytes.len() as u32,
        heap: 0,
    };
    assert_eq!(
        unsafe {
            gpu_init_upload_buffer(&mut upload, bytes.as_ptr() as *const c_void, &upload_options)
        },
        ResultCode::Ok
    );

    let mut readback = [0u8; 4];
    assert_eq!(
        unsafe { gpu_read_buffer(upload, 2, readback.as_mut_ptr() as *mut c_void, 4) },
        ResultCode::Ok
    );
    assert_eq!(readback, [3, 4, 5, 6]);

    for handle in [upload, storage, queue, device] {
        gpu_release(handle);
        assert_eq!(registry().kind_of(handle), None);
    }
}

#[test]
fn c_upload_into_private_heap() {
    setup();
    let device = device();

    let bytes = [0u8; 16];
    let options = GpuBufferOptions {
        device,
        size: 16,
        heap: Heap::Private as u32,
    };
    let mut buffer = Handle::from_raw(1);
    let code =
        unsafe { gpu_init_upload_buffer(&mut buffer, bytes.as_ptr() as *const c_void, &options) };
    assert_eq!(code, ResultCode::InvalidHeapForBufferWithBytes);
    assert!(buffer.is_null());

    gpu_release(device);
}

#[test]
fn c_null_arguments_are_unknown() {
    setup();
    let device = device();
    let options = GpuBufferOptions {
        device,
        size: 16,
        heap: 0,
    };

    let mut buffer = Handle::NULL;
    assert_eq!(
        unsafe { gpu_init_storage_buffer(&mut buffer, ptr::null()) },
        ResultCode::Unknown
    );
    assert_eq!(
        unsafe { gpu_init_storage_buffer(ptr::null_mut(), &options) },
        ResultCode::Unknown
    );
    assert_eq!(
        unsafe { gpu_init_upload_buffer(&mut buffer, ptr::null(), &options) },
        ResultCode::Unknown
    );
    assert_eq!(
        unsafe { gpu_init_queue(&mut buffer, ptr::null()) },
        ResultCode::Unknown
    );
    assert!(buffer.is_null());

    gpu_release(device);
}

#[test]
fn c_read_from_private_buffer_fails() {
    setup();
    let device = device();
    let options = GpuBufferOptions {
        device,
        size: 16,
        heap: Heap::Private as u32,
    };
    let mut buffer = Handle::NULL;
    assert_eq!(
        unsafe { gpu_init_storage_buffer(&mut buffer, &options) },
        ResultCode::Ok
    );

    let mut dst = [0u8; 16];
    assert_eq!(
        unsafe { gpu_read_buffer(buffer, 0, dst.as_mut_ptr() as *mut c_void, 16) },
        ResultCode::Unknown
    );

    gpu_release(buffer);
    gpu_release(device);
}

#[test]
fn c_release_tolerates_stale_and_null_handles() {
    setup();
    let device = device();
    gpu_release(device);
    gpu_release(device);
    gpu_release(Handle::NULL);
    assert_eq!(registry().kind_of(device), None);
}
