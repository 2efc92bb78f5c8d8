//! Integration tests for the simulated device and RAII buffers

use spbench_core::{
    BackendStatus, Device, DeviceBuffer, DeviceOp, Error, ErrorKind, HostDevice,
};
use std::sync::Arc;
use std::thread;

fn host() -> (Arc<HostDevice>, Arc<dyn Device>) {
    let host = Arc::new(HostDevice::new());
    let device: Arc<dyn Device> = host.clone();
    (host, device)
}

#[test]
fn buffers_are_freed_when_dropped_in_any_order() {
    let (host, device) = host();
    {
        let a = DeviceBuffer::<f64>::allocate(&device, 16, "a").unwrap();
        let b = DeviceBuffer::<i32>::allocate(&device, 8, "b").unwrap();
        let _c = DeviceBuffer::<f32>::allocate(&device, 4, "c").unwrap();
        assert_eq!(host.stats().live_allocations, 3);
        assert_eq!(host.stats().bytes_in_use, 16 * 8 + 8 * 4 + 4 * 4);
        drop(b);
        a.release().unwrap();
        assert_eq!(host.stats().live_allocations, 1);
    }
    let stats = host.stats();
    assert_eq!(stats.allocations, 3);
    assert_eq!(stats.frees, 3);
    assert_eq!(stats.live_allocations, 0);
    assert_eq!(stats.bytes_in_use, 0);
    assert_eq!(stats.peak_bytes, 16 * 8 + 8 * 4 + 4 * 4);
}

#[test]
fn capacity_limit_rejects_allocation() {
    let host = Arc::new(HostDevice::with_capacity(64));
    let device: Arc<dyn Device> = host.clone();
    let _fits = DeviceBuffer::<f64>::allocate(&device, 8, "fits").unwrap();
    let err = DeviceBuffer::<f64>::allocate(&device, 1, "overflow").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(matches!(
        err,
        Error::Backend { status: BackendStatus::AllocationFailed, .. }
    ));
    assert_eq!(host.capacity(), Some(64));
    assert_eq!(host.stats().live_allocations, 1);
}

#[test]
fn injected_fault_skips_earlier_calls() {
    let (host, device) = host();
    host.inject_fault(DeviceOp::Allocate, 2);
    let first = DeviceBuffer::<u8>::allocate(&device, 1, "first");
    let second = DeviceBuffer::<u8>::allocate(&device, 1, "second");
    let third = DeviceBuffer::<u8>::allocate(&device, 1, "third");
    let fourth = DeviceBuffer::<u8>::allocate(&device, 1, "fourth");
    assert!(first.is_ok());
    assert!(second.is_ok());
    let err = third.unwrap_err();
    assert!(err.to_string().contains("allocate third"));
    assert!(fourth.is_ok());
}

#[test]
fn queued_kernels_run_on_synchronize() {
    let (host, device) = host();
    let mut buf = DeviceBuffer::<f32>::allocate(&device, 4, "out").unwrap();
    buf.zero().unwrap();
    let ptr = buf.ptr();

    host.launch(move |mem| {
        mem.with_output::<f32, _>(ptr, |_, out| out.fill(2.5))
    })
    .unwrap();
    assert_eq!(host.stats().pending_launches, 1);

    device.synchronize().unwrap();
    let stats = host.stats();
    assert_eq!(stats.pending_launches, 0);
    assert_eq!(stats.launches, 1);
    assert_eq!(stats.synchronizations, 1);
    assert_eq!(buf.download().unwrap(), vec![2.5; 4]);
}

#[test]
fn failing_kernel_is_reported_by_synchronize() {
    let (host, device) = host();
    host.launch(|_| Err(BackendStatus::ExecutionFailed)).unwrap();
    assert_eq!(device.synchronize(), Err(BackendStatus::ExecutionFailed));
    // The failure is consumed
    assert_eq!(device.synchronize(), Ok(()));
}

#[test]
fn device_is_shared_across_threads() {
    let (host, device) = host();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let device = Arc::clone(&device);
            thread::spawn(move || {
                let mut buf = DeviceBuffer::<i32>::allocate(&device, 32, "worker").unwrap();
                buf.upload(&vec![i; 32]).unwrap();
                buf.download().unwrap()
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), vec![i as i32; 32]);
    }
    assert_eq!(host.stats().live_allocations, 0);
    assert_eq!(host.stats().allocations, 4);
}
