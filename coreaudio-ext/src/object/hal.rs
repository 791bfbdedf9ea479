//! Property access through the Core Audio HAL.

use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use core_foundation::base::TCFType;
use core_foundation::string::{CFString, CFStringRef};
use coreaudio_sys::{
    AudioObjectAddPropertyListener, AudioObjectGetPropertyData, AudioObjectGetPropertyDataSize,
    AudioObjectHasProperty, AudioObjectID, AudioObjectIsPropertySettable,
    AudioObjectPropertyAddress, AudioObjectRemovePropertyListener, AudioObjectSetPropertyData,
    Boolean, OSStatus,
};
use log::{debug, trace, warn};

use crate::object::backend::{ListenerToken, PropertyBackend, PropertyListener};
use crate::object::property_address::{ObjectId, PropertyAddress};
use crate::utils::errors::AudioObjectError;

fn sys_address(address: &PropertyAddress) -> AudioObjectPropertyAddress {
    AudioObjectPropertyAddress {
        mSelector: address.selector,
        mScope: address.scope,
        mElement: address.element,
    }
}

fn check(operation: &'static str, status: OSStatus) -> Result<(), AudioObjectError> {
    if status == 0 {
        Ok(())
    } else {
        debug!("{operation} returned {status}");
        Err(AudioObjectError::Status { operation, status })
    }
}

fn qualifier_parts(qualifier: Option<&[u8]>) -> (u32, *const c_void) {
    match qualifier {
        Some(q) if !q.is_empty() => (q.len() as u32, q.as_ptr().cast()),
        _ => (0, ptr::null()),
    }
}

struct Registration {
    object: ObjectId,
    address: PropertyAddress,
    // Handed to the HAL as client data; must outlive the registration
    listener: Box<PropertyListener>,
}

unsafe extern "C" fn listener_proc(
    object: AudioObjectID,
    count: u32,
    addresses: *const AudioObjectPropertyAddress,
    client_data: *mut c_void,
) -> OSStatus {
    if client_data.is_null() || addresses.is_null() {
        return 0;
    }
    // SAFETY: client data is the boxed listener kept alive in the registry,
    // and the HAL passes `count` valid addresses
    let (listener, addresses) = unsafe {
        (
            &*(client_data as *const PropertyListener),
            std::slice::from_raw_parts(addresses, count as usize),
        )
    };
    let changed: Vec<PropertyAddress> = addresses
        .iter()
        .map(|a| PropertyAddress::new(a.mSelector, a.mScope, a.mElement))
        .collect();
    listener(object, &changed);
    0
}

/// Backend calling `AudioObject*` functions of the host.
#[derive(Default)]
pub struct HalBackend {
    listeners: Mutex<HashMap<u64, Registration>>,
    next_token: AtomicU64,
}

impl HalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<u64, Registration>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PropertyBackend for HalBackend {
    fn has_property(&self, object: ObjectId, address: &PropertyAddress) -> bool {
        let address = sys_address(address);
        // SAFETY: address points to a valid structure for the call
        unsafe { AudioObjectHasProperty(object, &address) != 0 }
    }

    fn is_property_settable(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
    ) -> Result<bool, AudioObjectError> {
        let sys = sys_address(address);
        let mut settable: Boolean = 0;
        // SAFETY: both pointers reference live locals
        let status = unsafe { AudioObjectIsPropertySettable(object, &sys, &mut settable) };
        check("AudioObjectIsPropertySettable", status)?;
        Ok(settable != 0)
    }

    fn property_data_size(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        qualifier: Option<&[u8]>,
    ) -> Result<usize, AudioObjectError> {
        let sys = sys_address(address);
        let (qualifier_size, qualifier_data) = qualifier_parts(qualifier);
        let mut size: u32 = 0;
        // SAFETY: qualifier data is valid for qualifier_size bytes
        let status = unsafe {
            AudioObjectGetPropertyDataSize(object, &sys, qualifier_size, qualifier_data, &mut size)
        };
        check("AudioObjectGetPropertyDataSize", status)?;
        Ok(size as usize)
    }

    fn property_data(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        qualifier: Option<&[u8]>,
    ) -> Result<Vec<u8>, AudioObjectError> {
        let size = self.property_data_size(object, address, qualifier)?;
        trace!("Reading {size} bytes of {address} from object {object}");

        let sys = sys_address(address);
        let (qualifier_size, qualifier_data) = qualifier_parts(qualifier);
        let mut data = vec![0u8; size];
        let mut io_size = size as u32;
        // SAFETY: data has room for io_size bytes
        let status = unsafe {
            AudioObjectGetPropertyData(
                object,
                &sys,
                qualifier_size,
                qualifier_data,
                &mut io_size,
                data.as_mut_ptr().cast(),
            )
        };
        check("AudioObjectGetPropertyData", status)?;
        data.truncate(io_size as usize);
        Ok(data)
    }

    fn set_property_data(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        qualifier: Option<&[u8]>,
        data: &[u8],
    ) -> Result<(), AudioObjectError> {
        debug!("Setting {address} on object {object}");
        let sys = sys_address(address);
        let (qualifier_size, qualifier_data) = qualifier_parts(qualifier);
        // SAFETY: data is valid for its length
        let status = unsafe {
            AudioObjectSetPropertyData(
                object,
                &sys,
                qualifier_size,
                qualifier_data,
                data.len() as u32,
                data.as_ptr().cast(),
            )
        };
        check("AudioObjectSetPropertyData", status)
    }

    fn string_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
    ) -> Result<String, AudioObjectError> {
        let sys = sys_address(address);
        let mut string_ref: CFStringRef = ptr::null();
        let mut size = size_of::<CFStringRef>() as u32;
        // SAFETY: the HAL writes one retained CFStringRef
        let status = unsafe {
            AudioObjectGetPropertyData(
                object,
                &sys,
                0,
                ptr::null(),
                &mut size,
                (&mut string_ref as *mut CFStringRef).cast(),
            )
        };
        check("AudioObjectGetPropertyData", status)?;
        if string_ref.is_null() || size as usize != size_of::<CFStringRef>() {
            return Err(AudioObjectError::NotAString(address.to_string()));
        }
        // SAFETY: string properties follow the create rule
        let string = unsafe { CFString::wrap_under_create_rule(string_ref) };
        Ok(string.to_string())
    }

    fn add_property_listener(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        listener: PropertyListener,
    ) -> Result<ListenerToken, AudioObjectError> {
        let sys = sys_address(address);
        let listener = Box::new(listener);
        let client_data = &*listener as *const PropertyListener as *mut c_void;
        // SAFETY: client data stays boxed in the registry until removal
        let status = unsafe {
            AudioObjectAddPropertyListener(object, &sys, Some(listener_proc), client_data)
        };
        check("AudioObjectAddPropertyListener", status)?;

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.registry().insert(
            token,
            Registration {
                object,
                address: *address,
                listener,
            },
        );
        Ok(ListenerToken(token))
    }

    fn remove_property_listener(&self, token: ListenerToken) -> Result<(), AudioObjectError> {
        let Some(registration) = self.registry().remove(&token.0) else {
            return Err(AudioObjectError::Status {
                operation: "AudioObjectRemovePropertyListener",
                status: crate::utils::errors::AUDIO_PARAM,
            });
        };

        let sys = sys_address(&registration.address);
        let client_data = &*registration.listener as *const PropertyListener as *mut c_void;
        // SAFETY: same proc and client data as registered
        let status = unsafe {
            AudioObjectRemovePropertyListener(
                registration.object,
                &sys,
                Some(listener_proc),
                client_data,
            )
        };
        check("AudioObjectRemovePropertyListener", status)
    }
}

impl Drop for HalBackend {
    fn drop(&mut self) {
        let tokens: Vec<u64> = self.registry().keys().copied().collect();
        for token in tokens {
            if let Err(err) = self.remove_property_listener(ListenerToken(token)) {
                warn!("Failed to remove property listener: {err}");
            }
        }
    }
}
