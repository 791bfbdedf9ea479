use darling::Error;
use darling::ast::NestedMeta;
use quote::quote;
use syn::{Data, DeriveInput, Fields, ItemStruct, parse_macro_input};

use proc_macro::TokenStream;

fn struct_fields(input: &DeriveInput, derive: &str) -> Result<Fields, syn::Error> {
    match &input.data {
        Data::Struct(s) => Ok(s.fields.clone()),
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            format!("{derive} can only be derived for structs"),
        )),
    }
}

fn members(fields: &Fields) -> Vec<syn::Member> {
    match fields {
        Fields::Named(nf) => nf
            .named
            .iter()
            .filter_map(|f| f.ident.clone())
            .map(syn::Member::from)
            .collect(),
        Fields::Unnamed(uf) => uf
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, _)| syn::Index::from(i).into())
            .collect(),
        Fields::Unit => Vec::new(),
    }
}

#[proc_macro_derive(ToBytes)]
pub fn derive_to_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let fields = match struct_fields(&input, "ToBytes") {
        Ok(f) => members(&f),
        Err(e) => return e.to_compile_error().into(),
    };
    let name = &input.ident;

    let expanded = quote! {
        impl crate::utils::byteorder::WriteBytesBe for #name {
            fn write_be(&self, dst: &mut Vec<u8>) {
                #( crate::utils::byteorder::WriteBytesBe::write_be(&self.#fields, dst); )*
            }
        }

        impl crate::utils::byteorder::WriteBytesLe for #name {
            fn write_le(&self, dst: &mut Vec<u8>) {
                #( crate::utils::byteorder::WriteBytesLe::write_le(&self.#fields, dst); )*
            }
        }
    };

    TokenStream::from(expanded)
}

/// Reads every field in declaration order from a `ByteStream`. On failure the
/// stream is rewound to where the read started.
#[proc_macro_derive(FromBytes)]
pub fn derive_from_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let fields = match struct_fields(&input, "FromBytes") {
        Ok(f) => f,
        Err(e) => return e.to_compile_error().into(),
    };
    let name = &input.ident;

    let build = |order: &str, method: &str| {
        let order = syn::Ident::new(order, proc_macro2::Span::call_site());
        let method = syn::Ident::new(method, proc_macro2::Span::call_site());
        match &fields {
            Fields::Named(nf) => {
                let idents = nf.named.iter().map(|f| &f.ident);
                let types = nf.named.iter().map(|f| &f.ty);
                quote! {
                    Ok(Self { #( #idents: <#types as crate::utils::byteorder::#order>::#method(src)?, )* })
                }
            }
            Fields::Unnamed(uf) => {
                let types = uf.unnamed.iter().map(|f| &f.ty);
                quote! {
                    Ok(Self( #( <#types as crate::utils::byteorder::#order>::#method(src)?, )* ))
                }
            }
            Fields::Unit => quote! { Ok(Self) },
        }
    };

    let body_be = build("ReadBytesBe", "read_be");
    let body_le = build("ReadBytesLe", "read_le");

    let expanded = quote! {
        impl crate::utils::byteorder::ReadBytesBe for #name {
            fn read_be<S: AsRef<[u8]>>(
                src: &mut crate::utils::byte_stream::ByteStream<S>,
            ) -> Result<Self, crate::utils::errors::ByteStreamError> {
                let start = src.position();
                let result = (|| -> Result<Self, crate::utils::errors::ByteStreamError> {
                    #body_be
                })();
                if result.is_err() {
                    src.set_position(start)?;
                }
                result
            }
        }

        impl crate::utils::byteorder::ReadBytesLe for #name {
            fn read_le<S: AsRef<[u8]>>(
                src: &mut crate::utils::byte_stream::ByteStream<S>,
            ) -> Result<Self, crate::utils::errors::ByteStreamError> {
                let start = src.position();
                let result = (|| -> Result<Self, crate::utils::errors::ByteStreamError> {
                    #body_le
                })();
                if result.is_err() {
                    src.set_position(start)?;
                }
                result
            }
        }
    };

    TokenStream::from(expanded)
}

#[proc_macro_attribute]
pub fn caf_chunk_type(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match NestedMeta::parse_meta_list(attr.into()) {
        Ok(v) => v,
        Err(e) => {
            return TokenStream::from(Error::from(e).write_errors());
        }
    };

    let type_bytes = match args.first() {
        Some(NestedMeta::Lit(syn::Lit::ByteStr(bs))) => bs.value(),
        _ => {
            return TokenStream::from(
                Error::custom("caf_chunk_type expects a byte string, e.g. b\"desc\"")
                    .write_errors(),
            );
        }
    };

    if type_bytes.len() != 4 {
        return TokenStream::from(
            syn::Error::new_spanned(&args[0], "caf_chunk_type expects 4 bytes").to_compile_error(),
        );
    }
    let type_bytes_tokens = {
        let b = type_bytes;
        quote! {[#(#b),*]}
    };

    let input = parse_macro_input!(item as ItemStruct);
    let name = &input.ident;

    let expanded = quote! {
        #input

        impl crate::caf::CafChunk for #name {
            const CHUNK_TYPE: [u8; 4] = #type_bytes_tokens;

            fn chunk_data(&self) -> Vec<u8> {
                let mut vec = Vec::new();
                crate::utils::byteorder::WriteBytesBe::write_be(self, &mut vec);
                vec
            }
        }
    };
    TokenStream::from(expanded)
}
