//! Late-bound `IDispatch` plumbing: VARIANT constructors and a wrapper
//! that resolves properties and methods by name at call time.

#![cfg(windows)]

use std::mem::ManuallyDrop;
use std::ptr;

use windows::{
    core::{BSTR, GUID, HSTRING, PCWSTR},
    Win32::{
        Foundation::{DISP_E_EXCEPTION, DISP_E_PARAMNOTFOUND, VARIANT_BOOL},
        Globalization::GetSystemDefaultLCID,
        System::{
            Com::{
                CLSIDFromProgID, CoCreateInstance, IDispatch, CLSCTX_LOCAL_SERVER,
                DISPATCH_FLAGS, DISPATCH_METHOD, DISPATCH_PROPERTYGET, DISPATCH_PROPERTYPUT,
                DISPPARAMS, EXCEPINFO,
            },
            Ole::DISPID_PROPERTYPUT,
            Variant::{
                VARIANT, VT_BOOL, VT_BSTR, VT_DISPATCH, VT_EMPTY, VT_ERROR, VT_I2, VT_I4,
                VT_NULL, VT_R4, VT_R8,
            },
        },
    },
};

use xlhelm_automation::{AutomationError, Result};

// -- VARIANT construction --
// VARIANT wraps its inner unions in ManuallyDrop, so fields are set with
// ptr::write instead of assignment through DerefMut.

/// An empty VARIANT (`VT_EMPTY`).
pub fn variant_empty() -> VARIANT {
    VARIANT::default()
}

/// A VARIANT holding a boolean.
pub fn variant_bool(value: bool) -> VARIANT {
    unsafe {
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_BOOL);
        ptr::write(
            &mut inner.Anonymous.boolVal,
            VARIANT_BOOL(if value { -1 } else { 0 }),
        );
        v
    }
}

/// A VARIANT holding an f64.
pub fn variant_f64(value: f64) -> VARIANT {
    unsafe {
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_R8);
        ptr::write(&mut inner.Anonymous.dblVal, value);
        v
    }
}

/// A VARIANT holding an i32.
pub fn variant_i32(value: i32) -> VARIANT {
    unsafe {
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_I4);
        ptr::write(&mut inner.Anonymous.lVal, value);
        v
    }
}

/// A VARIANT holding a BSTR copy of `value`.
pub fn variant_str(value: &str) -> VARIANT {
    unsafe {
        let bstr = BSTR::from(value);
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_BSTR);
        ptr::write(&mut inner.Anonymous.bstrVal, ManuallyDrop::new(bstr));
        v
    }
}

/// A VARIANT referencing `object` (`VT_DISPATCH`, with an added reference).
pub fn variant_object(object: &Dispatch) -> VARIANT {
    unsafe {
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_DISPATCH);
        ptr::write(
            &mut inner.Anonymous.pdispVal,
            ManuallyDrop::new(Some(object.inner.clone())),
        );
        v
    }
}

/// The "argument not supplied" marker for optional positional parameters,
/// equivalent to omitting the argument in a scripting language.
pub fn variant_missing() -> VARIANT {
    unsafe {
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_ERROR);
        ptr::write(&mut inner.Anonymous.scode, DISP_E_PARAMNOTFOUND.0);
        v
    }
}

// -- VARIANT inspection --

/// The raw VT tag of a VARIANT.
pub fn variant_vt(v: &VARIANT) -> u16 {
    unsafe { v.Anonymous.Anonymous.vt.0 }
}

/// Extracts a boolean, or `None` for any other VT.
pub fn variant_get_bool(v: &VARIANT) -> Option<bool> {
    unsafe {
        if v.Anonymous.Anonymous.vt == VT_BOOL {
            Some(v.Anonymous.Anonymous.Anonymous.boolVal.0 != 0)
        } else {
            None
        }
    }
}

/// Extracts a number from any of the common numeric VTs.
pub fn variant_get_f64(v: &VARIANT) -> Option<f64> {
    unsafe {
        let vt = v.Anonymous.Anonymous.vt;
        let anon = &v.Anonymous.Anonymous.Anonymous;
        if vt == VT_R8 {
            Some(anon.dblVal)
        } else if vt == VT_R4 {
            Some(anon.fltVal as f64)
        } else if vt == VT_I4 {
            Some(anon.lVal as f64)
        } else if vt == VT_I2 {
            Some(anon.iVal as f64)
        } else {
            None
        }
    }
}

/// Extracts a string, or `None` for any other VT.
pub fn variant_get_string(v: &VARIANT) -> Option<String> {
    unsafe {
        if v.Anonymous.Anonymous.vt == VT_BSTR {
            let bstr = &v.Anonymous.Anonymous.Anonymous.bstrVal;
            Some(bstr.to_string())
        } else {
            None
        }
    }
}

/// Extracts the dispatch interface, or `None` when the VARIANT holds
/// anything else (including a null object reference).
pub fn variant_get_dispatch(v: &VARIANT) -> Option<IDispatch> {
    unsafe {
        if v.Anonymous.Anonymous.vt == VT_DISPATCH {
            // pdispVal is ManuallyDrop<Option<IDispatch>>
            let object: &Option<IDispatch> = &v.Anonymous.Anonymous.Anonymous.pdispVal;
            object.clone()
        } else {
            None
        }
    }
}

/// True for `VT_EMPTY` and `VT_NULL`.
pub fn variant_is_empty(v: &VARIANT) -> bool {
    unsafe {
        let vt = v.Anonymous.Anonymous.vt;
        vt == VT_EMPTY || vt == VT_NULL
    }
}

/// True for `VT_ERROR` (cell error values read back from the application).
pub fn variant_is_error(v: &VARIANT) -> bool {
    unsafe { v.Anonymous.Anonymous.vt == VT_ERROR }
}

// -- Dispatch --

/// One late-bound COM object. Cloning adds a reference to the same
/// underlying object.
#[derive(Clone)]
pub struct Dispatch {
    inner: IDispatch,
}

impl Dispatch {
    /// Instantiates a COM server from its ProgID, e.g. `"Excel.Application"`.
    pub fn from_progid(progid: &str) -> Result<Self> {
        unsafe {
            let name = HSTRING::from(progid);
            let clsid = CLSIDFromProgID(&name)
                .map_err(|e| AutomationError::call_failed("CLSIDFromProgID", e))?;
            let inner: IDispatch = CoCreateInstance(&clsid, None, CLSCTX_LOCAL_SERVER)
                .map_err(|e| {
                    AutomationError::call_failed(format!("CoCreateInstance({progid})"), e)
                })?;
            Ok(Self { inner })
        }
    }

    /// Wraps an interface pointer obtained elsewhere.
    pub fn from_idispatch(inner: IDispatch) -> Self {
        Self { inner }
    }

    /// Resolves member and parameter names to DISPIDs in one call. The
    /// first name is the member, the rest are named parameters.
    fn dispids(&self, names: &[&str]) -> Result<Vec<i32>> {
        unsafe {
            let wide: Vec<Vec<u16>> = names
                .iter()
                .map(|name| name.encode_utf16().chain(std::iter::once(0)).collect())
                .collect();
            let pointers: Vec<PCWSTR> = wide.iter().map(|name| PCWSTR(name.as_ptr())).collect();
            let mut dispids = vec![0i32; names.len()];
            self.inner
                .GetIDsOfNames(
                    &GUID::zeroed(),
                    pointers.as_ptr(),
                    names.len() as u32,
                    GetSystemDefaultLCID(),
                    dispids.as_mut_ptr(),
                )
                .map_err(|e| {
                    AutomationError::call_failed(names[0], format!("name lookup failed: {e}"))
                })?;
            Ok(dispids)
        }
    }

    /// Shared Invoke path for property gets and method calls. Named
    /// arguments occupy the front of `rgvarg` with their DISPIDs alongside;
    /// positional arguments follow in reverse order, as DISPPARAMS requires.
    fn invoke_raw(
        &self,
        name: &str,
        flags: DISPATCH_FLAGS,
        positional: &[VARIANT],
        named: &[(&str, VARIANT)],
    ) -> Result<VARIANT> {
        let mut names: Vec<&str> = Vec::with_capacity(1 + named.len());
        names.push(name);
        names.extend(named.iter().map(|(param, _)| *param));
        let dispids = self.dispids(&names)?;
        unsafe {
            let mut args: Vec<VARIANT> = named.iter().map(|(_, value)| value.clone()).collect();
            args.extend(positional.iter().rev().cloned());
            let mut named_ids: Vec<i32> = dispids[1..].to_vec();
            let params = DISPPARAMS {
                rgvarg: if args.is_empty() {
                    ptr::null_mut()
                } else {
                    args.as_mut_ptr()
                },
                rgdispidNamedArgs: if named_ids.is_empty() {
                    ptr::null_mut()
                } else {
                    named_ids.as_mut_ptr()
                },
                cArgs: args.len() as u32,
                cNamedArgs: named_ids.len() as u32,
            };
            let mut result = VARIANT::default();
            let mut except = EXCEPINFO::default();
            self.inner
                .Invoke(
                    dispids[0],
                    &GUID::zeroed(),
                    GetSystemDefaultLCID(),
                    flags,
                    &params,
                    Some(&mut result),
                    Some(&mut except),
                    None,
                )
                .map_err(|e| invoke_error(e, &except, name))?;
            Ok(result)
        }
    }

    /// Reads a property value.
    pub fn get_property(&self, name: &str) -> Result<VARIANT> {
        self.invoke_raw(name, DISPATCH_PROPERTYGET, &[], &[])
    }

    /// Writes a property value.
    pub fn set_property(&self, name: &str, value: VARIANT) -> Result<()> {
        let dispid = self.dispids(&[name])?[0];
        unsafe {
            let mut args = [value];
            let mut named = [DISPID_PROPERTYPUT];
            let params = DISPPARAMS {
                rgvarg: args.as_mut_ptr(),
                rgdispidNamedArgs: named.as_mut_ptr(),
                cArgs: 1,
                cNamedArgs: 1,
            };
            let mut except = EXCEPINFO::default();
            self.inner
                .Invoke(
                    dispid,
                    &GUID::zeroed(),
                    GetSystemDefaultLCID(),
                    DISPATCH_PROPERTYPUT,
                    &params,
                    None,
                    Some(&mut except),
                    None,
                )
                .map_err(|e| invoke_error(e, &except, name))?;
            Ok(())
        }
    }

    /// Calls a method with positional arguments in natural order.
    pub fn invoke(&self, name: &str, args: &[VARIANT]) -> Result<VARIANT> {
        self.invoke_raw(name, DISPATCH_METHOD, args, &[])
    }

    /// Calls a method with positional and named arguments, the named ones
    /// given as `(parameter, value)` pairs.
    pub fn invoke_named(
        &self,
        name: &str,
        args: &[VARIANT],
        named: &[(&str, VARIANT)],
    ) -> Result<VARIANT> {
        self.invoke_raw(name, DISPATCH_METHOD, args, named)
    }

    /// Reads a property that holds another object.
    pub fn get_object(&self, name: &str) -> Result<Dispatch> {
        let result = self.get_property(name)?;
        as_object(&result, name)
    }

    /// Reads a parameterized property, e.g. `Item(1)`, `Range("A1")`, or
    /// `Cells(row, column)`.
    pub fn get_indexed(&self, name: &str, indexes: &[VARIANT]) -> Result<Dispatch> {
        let result = self.invoke_raw(name, DISPATCH_PROPERTYGET, indexes, &[])?;
        as_object(&result, name)
    }

    /// Calls a method and unwraps the object it returns.
    pub fn invoke_object(&self, name: &str, args: &[VARIANT]) -> Result<Dispatch> {
        let result = self.invoke(name, args)?;
        as_object(&result, name)
    }

    /// Calls a method with named arguments and unwraps the object it
    /// returns.
    pub fn invoke_object_named(
        &self,
        name: &str,
        args: &[VARIANT],
        named: &[(&str, VARIANT)],
    ) -> Result<Dispatch> {
        let result = self.invoke_named(name, args, named)?;
        as_object(&result, name)
    }
}

/// Unwraps a dispatch interface from a VARIANT, with the member name for
/// error context.
fn as_object(variant: &VARIANT, context: &str) -> Result<Dispatch> {
    if let Some(inner) = variant_get_dispatch(variant) {
        Ok(Dispatch::from_idispatch(inner))
    } else if variant_is_empty(variant) {
        Err(AutomationError::call_failed(
            context,
            "returned no object",
        ))
    } else {
        Err(AutomationError::call_failed(
            context,
            format!("returned VT={} where an object was expected", variant_vt(variant)),
        ))
    }
}

/// Maps an Invoke failure to an error, pulling the application's own
/// description out of EXCEPINFO when one was raised.
fn invoke_error(error: windows::core::Error, except: &EXCEPINFO, member: &str) -> AutomationError {
    if error.code().0 as u32 == DISP_E_EXCEPTION.0 as u32 {
        let description = if except.bstrDescription.is_empty() {
            String::from("(no description)")
        } else {
            except.bstrDescription.to_string()
        };
        let source = if except.bstrSource.is_empty() {
            String::from("(no source)")
        } else {
            except.bstrSource.to_string()
        };
        AutomationError::call_failed(member, format!("{description} (source: {source})"))
    } else {
        AutomationError::call_failed(member, error)
    }
}
