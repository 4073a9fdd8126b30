//! Byte-level erasure of adapted callables.
//!
//! Each bound operation is stored as a [`Procedure`] that decodes the argument
//! tuple, calls the adapted callable, and encodes the result. This is the only
//! place where typed handlers meet payload bytes.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use dispatch::Discipline;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use transport::{CallMode, Reply, Request, Response, ResponseError};

pub(crate) trait Procedure: Send + Sync {
    fn invoke(&self, method: &str, mode: CallMode, args: &[u8]) -> Reply;
}

pub(crate) struct Bound<F, Args, R> {
    call: F,
    _signature: PhantomData<fn(Args) -> R>,
}

impl<F, Args, R> Bound<F, Args, R> {
    pub(crate) fn new(call: F) -> Self {
        Self {
            call,
            _signature: PhantomData,
        }
    }
}

impl<F, Args, R> Procedure for Bound<F, Args, R>
where
    F: Fn(CallMode, Args) -> Response<R> + Send + Sync,
    Args: DeserializeOwned,
    R: Serialize,
{
    fn invoke(&self, method: &str, mode: CallMode, args: &[u8]) -> Reply {
        let args: Args = transport::decode(args)
            .map_err(|err| ResponseError::invalid_arguments(method, err))?;
        let value = (self.call)(mode, args)?;
        transport::encode(&value).map_err(|err| {
            ResponseError::internal(format!("failed to encode result of {method:?}: {err}"))
        })
    }
}

#[derive(Clone)]
struct Entry {
    discipline: Discipline,
    procedure: Arc<dyn Procedure>,
}

/// Operation name to procedure map. Frozen into an `Arc` when workers start.
#[derive(Clone, Default)]
pub(crate) struct Registry {
    entries: HashMap<String, Entry>,
}

impl Registry {
    /// Binds `procedure` under `name`, replacing any earlier binding.
    pub(crate) fn insert(
        &mut self,
        name: &str,
        discipline: Discipline,
        procedure: Arc<dyn Procedure>,
    ) {
        let entry = Entry {
            discipline,
            procedure,
        };
        if let Some(previous) = self.entries.insert(name.to_owned(), entry) {
            debug!(
                "rebinding {name:?} ({:?} -> {discipline:?})",
                previous.discipline
            );
        } else {
            debug!("bound {name:?} as {discipline:?}");
        }
    }

    pub(crate) fn dispatch(&self, request: &Request) -> Reply {
        let entry = self
            .entries
            .get(&request.method)
            .ok_or_else(|| ResponseError::unknown_method(&request.method))?;
        entry
            .procedure
            .invoke(&request.method, request.mode, &request.args)
    }

    pub(crate) fn discipline(&self, name: &str) -> Option<Discipline> {
        self.entries.get(name).map(|entry| entry.discipline)
    }

    pub(crate) fn methods(&self) -> Vec<(String, Discipline)> {
        let mut methods: Vec<_> = self
            .entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.discipline))
            .collect();
        methods.sort_by(|a, b| a.0.cmp(&b.0));
        methods
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
