// =============================================================================
// GPU BRIDGE SELF-CHECK - exercise the device/queue/buffer lifecycle end to end
// =============================================================================
//
// FLOW:
// 1. Load config.toml and set up logging
// 2. Acquire a device handle (Vulkan, or host emulation as fallback)
// 3. Create a queue and a storage buffer
// 4. Create an upload buffer and read it back
// 5. Check that bytes into a private heap are refused
// 6. Release everything, dependents first
//
// =============================================================================

use anyhow::{ensure, Context, Result};
use gpu_bridge::{BufferOptions, Config, Error, Heap, QueueOptions, Registry, ResultCode};
use std::fs::OpenOptions;
use std::io::Write;

fn main() -> Result<()> {
    // Load configuration from config.toml
    let config = Config::load();

    init_logging(&config);
    log::info!("Starting gpu-bridge self-check");
    log::info!("Backend: {:?}", config.backend.kind);

    let queue_count = config.queue.default_command_buffer_count;
    let registry = Registry::new(config);

    let device = registry.init_device().context("Failed to acquire a device")?;
    log::info!("Device: {}", registry.device_name(device)?);

    let queue = registry
        .init_queue(&QueueOptions {
            device,
            max_command_buffer_count: queue_count,
        })
        .context("Failed to create queue")?;
    log::info!(
        "Queue: {} command buffers in flight",
        registry.queue_max_command_buffer_count(queue)?
    );

    let storage = registry
        .init_storage_buffer(&BufferOptions::new(device, 1 << 20))
        .context("Failed to create storage buffer")?;
    log::info!(
        "Storage buffer: {} bytes in {:?} heap",
        registry.buffer_size(storage)?,
        registry.buffer_heap(storage)?
    );

    let pattern: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let upload = registry
        .init_upload_buffer(&pattern, &BufferOptions::new(device, pattern.len() as u32))
        .context("Failed to create upload buffer")?;
    let readback = registry.read_buffer(upload, 0, pattern.len() as u64)?;
    ensure!(readback == pattern, "Upload buffer contents do not match");
    log::info!("Upload buffer: {} bytes verified", readback.len());

    let refused = registry.init_upload_buffer(
        &pattern[..16],
        &BufferOptions::new(device, 16).with_heap(Heap::Private),
    );
    match &refused {
        Err(Error::InvalidHeapForBufferWithBytes { .. }) => {
            log::info!("Private heap upload refused: {:?}", ResultCode::from(&refused))
        }
        other => anyhow::bail!("Expected heap mismatch, got {:?}", other.as_ref().err()),
    }

    let slots = registry.queue_max_command_buffer_count(queue)?;
    // One more marker than there are slots makes the queue recycle one
    for _ in 0..=slots {
        registry.submit_marker(queue)?;
    }
    registry.wait_queue_idle(queue)?;
    log::info!("Queue drained after {} markers", slots + 1);

    registry.release(upload);
    registry.release(storage);
    registry.release(queue);
    registry.release(device);
    log::info!("Self-check complete, {} live handles", registry.live_handles());

    Ok(())
}

/// Initialize logging with optional file banner
fn init_logging(config: &Config) {
    use env_logger::Builder;

    let mut builder = Builder::from_default_env();
    builder.filter_level(config.log_level());
    builder.init();

    // Create/clear log file if enabled
    if config.debug.log_to_file {
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.debug.log_file)
        {
            let _ = writeln!(file, "=== gpu-bridge self-check ===");
            let _ = writeln!(file, "Started: {:?}", std::time::SystemTime::now());
            let _ = writeln!(file, "Backend: {:?}", config.backend.kind);
        }
    }
}
