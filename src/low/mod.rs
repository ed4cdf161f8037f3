//! The low-level model: node-backed objects that preserve every source
//! token's position, ordering, and reference provenance.
//!
//! Each specification object lives in its own module. Everything here is
//! built once by [`create_document`](crate::create_document) and immutable
//! thereafter; the typed façade in [`high`](crate::high) is a thin view over
//! these objects.

mod callback;
mod components;
mod discriminator;
mod document;
mod example;
mod external_doc;
mod header;
mod info;
mod link;
mod media_type;
mod operation;
mod parameter;
mod path_item;
mod request_body;
mod response;
mod schema;
mod security_scheme;
mod server;
mod tag;
mod xml;

pub use self::{
    callback::*,
    components::*,
    discriminator::*,
    document::*,
    example::*,
    external_doc::*,
    header::*,
    info::*,
    link::*,
    media_type::*,
    operation::*,
    parameter::*,
    path_item::*,
    request_body::*,
    response::*,
    schema::{AdditionalProperties, ExclusiveBound, Schema, SchemaProxy, TypeSet},
    security_scheme::*,
    server::*,
    tag::*,
    xml::*,
};
