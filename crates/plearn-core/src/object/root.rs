//! The root class `Object`: no options, and the remote methods every
//! object answers to

use super::{ObjectExt, Object};
use crate::error::PResult;
use crate::option::OptionList;
use crate::remote::{dyn_method0, dyn_method1, dyn_method2, RemoteMethodDoc, RemoteMethodMap, Serialized};
use once_cell::sync::{Lazy, OnceCell};
use std::collections::BTreeMap;

static ROOT_OPTIONS: Lazy<OptionList> = Lazy::new(OptionList::new);

/// Option list of the root class (empty)
pub fn root_option_list() -> &'static OptionList {
    &ROOT_OPTIONS
}

/// Remote methods inherited by every class
pub fn root_remote_methods() -> &'static RemoteMethodMap {
    static MAP: OnceCell<RemoteMethodMap> = OnceCell::new();
    MAP.get_or_init(|| RemoteMethodMap::for_class("Object", None, declare_root_methods))
}

fn declare_root_methods(rmm: &mut RemoteMethodMap) {
    rmm.insert(
        "build",
        dyn_method0(build, RemoteMethodDoc::new("Finish construction after options are set")),
    );
    rmm.insert(
        "getOption",
        dyn_method1(
            get_option,
            RemoteMethodDoc::new("Value of an option, in the text format")
                .arg("name", "Option path")
                .returns("Serialized option value"),
        ),
    );
    rmm.insert(
        "setOption",
        dyn_method2(
            set_option,
            RemoteMethodDoc::new("Parse a value into an option")
                .arg("name", "Option path")
                .arg("value", "Value in the text format"),
        ),
    );
    rmm.insert(
        "changeOptions",
        dyn_method1(
            change_options,
            RemoteMethodDoc::new("Set several options at once")
                .arg("options", "Map from option path to value text"),
        ),
    );
    rmm.insert(
        "asString",
        dyn_method0(
            as_string,
            RemoteMethodDoc::new("The object in the text format").returns("Serialized object"),
        ),
    );
    rmm.insert(
        "classname",
        dyn_method0(
            classname,
            RemoteMethodDoc::new("Class of the object").returns("Class name"),
        ),
    );
    rmm.insert(
        "save",
        dyn_method2(
            save,
            RemoteMethodDoc::new("Save the object to a file")
                .arg("path", "Destination file")
                .arg("format", "plearn_ascii or plearn_binary"),
        ),
    );
}

fn build(obj: &mut dyn Object) -> PResult<()> {
    obj.build()
}

fn get_option(obj: &mut dyn Object, name: String) -> PResult<Serialized> {
    obj.get_option(&name).map(Serialized)
}

fn set_option(obj: &mut dyn Object, name: String, value: String) -> PResult<()> {
    obj.set_option(&name, &value)
}

fn change_options(obj: &mut dyn Object, options: BTreeMap<String, String>) -> PResult<()> {
    obj.change_options(options)
}

fn as_string(obj: &mut dyn Object) -> PResult<String> {
    obj.as_string()
}

fn classname(obj: &mut dyn Object) -> PResult<String> {
    Ok(obj.class_name().to_string())
}

fn save(obj: &mut dyn Object, path: String, format: String) -> PResult<()> {
    obj.save(&path, format.parse()?)
}
