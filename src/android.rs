//! JNI bindings for Android.
//!
//! These functions are called from Kotlin via the JNI bridge.

use jni::objects::{JByteArray, JClass, JString};
use jni::sys::jstring;
use jni::JNIEnv;

use crate::{layout_bytes_to_json, layout_file_to_json};

/// Parse a MIDI file at the given path and lay it out, returning the
/// symbol graph as JSON.
///
/// Called from Kotlin as:
///   external fun layoutFile(path: String): String?
#[no_mangle]
pub extern "system" fn Java_com_sheetlib_app_SheetLib_layoutFile(
    mut env: JNIEnv,
    _class: JClass,
    path: JString,
) -> jstring {
    let path_str: String = match env.get_string(&path) {
        Ok(s) => s.into(),
        Err(_) => return std::ptr::null_mut(),
    };

    match layout_file_to_json(&path_str) {
        Ok(json) => match env.new_string(&json) {
            Ok(js) => js.into_raw(),
            Err(_) => std::ptr::null_mut(),
        },
        Err(_) => std::ptr::null_mut(),
    }
}

/// Parse MIDI bytes and lay them out, returning the symbol graph as
/// JSON.
///
/// Called from Kotlin as:
///   external fun layoutBytes(data: ByteArray): String?
#[no_mangle]
pub extern "system" fn Java_com_sheetlib_app_SheetLib_layoutBytes(
    mut env: JNIEnv,
    _class: JClass,
    data: JByteArray,
) -> jstring {
    let bytes = match env.convert_byte_array(&data) {
        Ok(b) => b,
        Err(_) => return std::ptr::null_mut(),
    };

    match layout_bytes_to_json(&bytes) {
        Ok(json) => match env.new_string(&json) {
            Ok(js) => js.into_raw(),
            Err(_) => std::ptr::null_mut(),
        },
        Err(_) => std::ptr::null_mut(),
    }
}
