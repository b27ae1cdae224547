// AppleSMC user client over IOKit.

use std::ffi::{c_char, c_void};
use std::sync::Mutex;

use super::{FourCc, SmcConnection, SmcValue};
use crate::error::SmcError;

type KernReturn = libc::c_int;
type IoObject = libc::mach_port_t;

const KERN_SUCCESS: KernReturn = 0;
const MAIN_PORT_DEFAULT: libc::mach_port_t = 0;

const SELECTOR_HANDLE_YPC_EVENT: u32 = 2;
const CMD_READ_KEY: u8 = 5;
const CMD_WRITE_KEY: u8 = 6;
const CMD_GET_KEY_INFO: u8 = 9;
const RESULT_KEY_NOT_FOUND: u8 = 0x84;

#[link(name = "IOKit", kind = "framework")]
unsafe extern "C" {
    fn IOServiceMatching(name: *const c_char) -> *mut c_void;
    fn IOServiceGetMatchingServices(
        main_port: libc::mach_port_t,
        matching: *mut c_void,
        existing: *mut IoObject,
    ) -> KernReturn;
    fn IOIteratorNext(iterator: IoObject) -> IoObject;
    fn IOObjectRelease(object: IoObject) -> KernReturn;
    fn IOServiceOpen(
        service: IoObject,
        owning_task: libc::mach_port_t,
        kind: u32,
        connect: *mut IoObject,
    ) -> KernReturn;
    fn IOServiceClose(connect: IoObject) -> KernReturn;
    fn IOConnectCallStructMethod(
        connection: IoObject,
        selector: u32,
        input: *const c_void,
        input_size: usize,
        output: *mut c_void,
        output_size: *mut usize,
    ) -> KernReturn;
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct Version {
    major: u8,
    minor: u8,
    build: u8,
    reserved: u8,
    release: u16,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct PLimitData {
    version: u16,
    length: u16,
    cpu_p_limit: u32,
    gpu_p_limit: u32,
    mem_p_limit: u32,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct KeyInfo {
    data_size: u32,
    data_type: u32,
    data_attributes: u8,
}

/// Kernel-side `SMCParamStruct`; 80 bytes.
#[repr(C)]
#[derive(Default, Clone, Copy)]
struct ParamStruct {
    key: u32,
    vers: Version,
    p_limit_data: PLimitData,
    key_info: KeyInfo,
    result: u8,
    status: u8,
    data8: u8,
    data32: u32,
    bytes: [u8; 32],
}

const _: () = assert!(std::mem::size_of::<ParamStruct>() == 80);

pub(super) struct IoKitSmc {
    connection: IoObject,
    lock: Mutex<()>,
}

impl IoKitSmc {
    pub(super) fn open() -> Result<Self, SmcError> {
        // SAFETY: plain IOKit calls; every returned object is released below.
        unsafe {
            let matching = IOServiceMatching(c"AppleSMC".as_ptr());
            if matching.is_null() {
                return Err(SmcError::Closed);
            }
            let mut iterator: IoObject = 0;
            let status = IOServiceGetMatchingServices(MAIN_PORT_DEFAULT, matching, &mut iterator);
            if status != KERN_SUCCESS {
                return Err(SmcError::Kernel {
                    key: "AppleSMC".into(),
                    status,
                });
            }
            let device = IOIteratorNext(iterator);
            IOObjectRelease(iterator);
            if device == 0 {
                return Err(SmcError::Closed);
            }
            let mut connection: IoObject = 0;
            #[allow(deprecated)]
            let task = libc::mach_task_self();
            let status = IOServiceOpen(device, task, 0, &mut connection);
            IOObjectRelease(device);
            if status != KERN_SUCCESS {
                return Err(SmcError::Kernel {
                    key: "AppleSMC".into(),
                    status,
                });
            }
            Ok(Self {
                connection,
                lock: Mutex::new(()),
            })
        }
    }

    fn call(&self, key: FourCc, input: &ParamStruct) -> Result<ParamStruct, SmcError> {
        let mut output = ParamStruct::default();
        let mut output_size = std::mem::size_of::<ParamStruct>();
        // SAFETY: both buffers are live, correctly sized `repr(C)` structs.
        let status = unsafe {
            IOConnectCallStructMethod(
                self.connection,
                SELECTOR_HANDLE_YPC_EVENT,
                (input as *const ParamStruct).cast(),
                std::mem::size_of::<ParamStruct>(),
                (&mut output as *mut ParamStruct).cast(),
                &mut output_size,
            )
        };
        if status != KERN_SUCCESS {
            return Err(SmcError::Kernel {
                key: key.to_string(),
                status,
            });
        }
        match output.result {
            0 => Ok(output),
            RESULT_KEY_NOT_FOUND => Err(SmcError::KeyNotFound(key.to_string())),
            code => Err(SmcError::Rejected {
                key: key.to_string(),
                code,
            }),
        }
    }
}

impl SmcConnection for IoKitSmc {
    fn read_key(&self, key: FourCc) -> Result<SmcValue, SmcError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let info = self.call(
            key,
            &ParamStruct {
                key: key.as_u32(),
                data8: CMD_GET_KEY_INFO,
                ..Default::default()
            },
        )?;
        let data_size = info.key_info.data_size;

        let mut input = ParamStruct {
            key: key.as_u32(),
            data8: CMD_READ_KEY,
            ..Default::default()
        };
        input.key_info.data_size = data_size;
        let output = self.call(key, &input)?;

        let len = (data_size as usize).min(output.bytes.len());
        Ok(SmcValue {
            data_type: FourCc::from_u32(info.key_info.data_type),
            data_size,
            bytes: output.bytes[..len].to_vec(),
        })
    }

    fn write_key(&self, key: FourCc, data_type: FourCc, bytes: &[u8]) -> Result<(), SmcError> {
        let mut input = ParamStruct {
            key: key.as_u32(),
            data8: CMD_WRITE_KEY,
            ..Default::default()
        };
        if bytes.len() > input.bytes.len() {
            return Err(SmcError::PayloadTooLarge {
                key: key.to_string(),
                len: bytes.len(),
            });
        }
        input.key_info.data_size = bytes.len() as u32;
        input.key_info.data_type = data_type.as_u32();
        input.bytes[..bytes.len()].copy_from_slice(bytes);

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.call(key, &input).map(|_| ())
    }
}

impl Drop for IoKitSmc {
    fn drop(&mut self) {
        // SAFETY: the connection was opened by `open` and is closed exactly once.
        unsafe {
            IOServiceClose(self.connection);
        }
    }
}
