use crate::capture::touch::source::{FrameSink, FrameSource};
use crate::capture::touch::types::{FingerRecord, FingerState, TouchFrame};
use crate::engine::{GestureError, GestureResult};
use core_foundation::array::{CFArrayGetCount, CFArrayGetValueAtIndex, CFArrayRef};
use core_foundation::base::CFRelease;
use parking_lot::Mutex as ParkingMutex;
use std::ffi::c_void;
use std::os::raw::{c_double, c_float, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};

type MTDeviceRef = *mut c_void;
type ContactFrameCallback =
    extern "C" fn(MTDeviceRef, *const MTFinger, c_int, c_double, c_int) -> c_int;

#[repr(C)]
#[derive(Copy, Clone, Debug)]
struct MTPoint {
    x: c_float,
    y: c_float,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
#[allow(dead_code)]
struct MTReadout {
    pos: MTPoint,
    vel: MTPoint,
}

/// Per-contact record as laid out by MultitouchSupport
#[repr(C)]
#[derive(Copy, Clone, Debug)]
#[allow(dead_code)]
struct MTFinger {
    frame: c_int,
    timestamp: c_double,
    identifier: c_int,
    state: c_int,
    _unknown1: [c_int; 4],
    normalized: MTReadout,
    size: c_float,
    _unknown2: c_int,
    angle: c_float,
    major_axis: c_float,
    minor_axis: c_float,
    _unknown3: [c_int; 5],
}

// FFI declarations for the private MultitouchSupport framework
#[link(name = "MultitouchSupport", kind = "framework")]
extern "C" {
    fn MTDeviceCreateList() -> CFArrayRef;
    fn MTRegisterContactFrameCallback(device: MTDeviceRef, callback: ContactFrameCallback);
    fn MTUnregisterContactFrameCallback(device: MTDeviceRef, callback: ContactFrameCallback);
    fn MTDeviceStart(device: MTDeviceRef, mode: c_int);
    fn MTDeviceStop(device: MTDeviceRef);
}

/// The contact callback carries no user data, so the active sink lives here.
/// Only one `MultitouchSource` can be open at a time.
static FRAME_SINK: ParkingMutex<Option<FrameSink>> = parking_lot::const_mutex(None);

struct DeviceHandle {
    list: CFArrayRef,
    device: MTDeviceRef,
}

// Safety: both pointers are only touched from `open`/`close`, which take `&mut self`
unsafe impl Send for DeviceHandle {}

/// Frame source bound to the first multitouch device (built-in or Magic Trackpad)
pub struct MultitouchSource {
    handle: Option<DeviceHandle>,
}

impl MultitouchSource {
    pub fn new() -> Self {
        Self { handle: None }
    }
}

impl Default for MultitouchSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for MultitouchSource {
    fn name(&self) -> &str {
        "multitouch"
    }

    fn open(&mut self, sink: FrameSink) -> GestureResult<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let list = unsafe { MTDeviceCreateList() };
        if list.is_null() {
            return Err(GestureError::DeviceNotFound(
                "MultitouchSupport returned no device list".to_string(),
            ));
        }

        let count = unsafe { CFArrayGetCount(list) };
        if count == 0 {
            unsafe { CFRelease(list as *const c_void) };
            return Err(GestureError::DeviceNotFound("Trackpad not found".to_string()));
        }

        let device = unsafe { CFArrayGetValueAtIndex(list, 0) } as MTDeviceRef;
        *FRAME_SINK.lock() = Some(sink);

        unsafe {
            MTRegisterContactFrameCallback(device, on_contact_frame);
            MTDeviceStart(device, 0);
        }

        tracing::info!("Multitouch device started ({} device(s) present)", count);
        self.handle = Some(DeviceHandle { list, device });
        Ok(())
    }

    fn close(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        unsafe {
            MTUnregisterContactFrameCallback(handle.device, on_contact_frame);
            MTDeviceStop(handle.device);
            CFRelease(handle.list as *const c_void);
        }
        *FRAME_SINK.lock() = None;

        tracing::info!("Multitouch device stopped");
    }
}

impl Drop for MultitouchSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Driver state codes: 1 starts a contact, 4 ends it. Any other code on a
/// reported contact (hover, linger, pressure transitions) means it is still
/// there, so it maps to `Move` rather than vanishing from the frame.
fn finger_state(raw: c_int) -> FingerState {
    match raw {
        1 => FingerState::Down,
        4 => FingerState::Up,
        _ => FingerState::Move,
    }
}

fn finger_record(finger: &MTFinger) -> FingerRecord {
    FingerRecord::new(
        finger.identifier,
        finger_state(finger.state),
        finger.normalized.pos.x,
        finger.normalized.pos.y,
    )
}

/// Keeps the driver's own count so the classifier can catch short deliveries
fn contact_frame(timestamp: f64, count: c_int, fingers: &[MTFinger]) -> TouchFrame {
    TouchFrame {
        timestamp,
        finger_count: count,
        fingers: fingers.iter().map(finger_record).collect(),
    }
}

extern "C" fn on_contact_frame(
    _device: MTDeviceRef,
    data: *const MTFinger,
    count: c_int,
    timestamp: c_double,
    _frame: c_int,
) -> c_int {
    let Some(sink) = FRAME_SINK.lock().clone() else {
        return 0;
    };

    let fingers: &[MTFinger] = if data.is_null() || count <= 0 {
        &[]
    } else {
        // Safety: the driver guarantees `count` contiguous records for the callback's duration
        unsafe { std::slice::from_raw_parts(data, count as usize) }
    };
    let frame = contact_frame(timestamp, count, fingers);

    // Unwinding into the driver thread would abort the process
    if catch_unwind(AssertUnwindSafe(|| sink(frame))).is_err() {
        tracing::error!("Touch frame handler panicked; frame dropped");
    }
    0
}
