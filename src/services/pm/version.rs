// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Handling of the API versions reported by `FEATURE_CHECK`.

use super::defs::{PM_API_BASE_VERSION, PM_API_QUERY_DATA_VERSION, PmApiId, QueryId};

/// Returns the version of the given API implemented by this service, in the upper half of the
/// version word.
pub fn local_version(api_id: u32) -> u32 {
    match PmApiId::try_from(api_id) {
        Ok(PmApiId::GetCallbackData | PmApiId::GetTrustzoneVersion | PmApiId::QueryData) => {
            PM_API_QUERY_DATA_VERSION << 16
        }
        _ => PM_API_BASE_VERSION << 16,
    }
}

/// How a `QUERY_DATA` call must be made, according to the firmware's version of it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryDataFormat {
    /// Version 3 retired the call from this service.
    Retired,
    /// Version 2 name queries prefix the reply with an extra status word.
    StatusPrefixed,
    /// Four words of data.
    Plain,
}

impl QueryDataFormat {
    /// Classifies a `QUERY_DATA` call with the given query ID, given the version word returned by
    /// the feature check.
    pub fn classify(version: u32, qid: u32) -> Self {
        match version & 0xffff {
            3 => Self::Retired,
            2 if is_name_query(qid) => Self::StatusPrefixed,
            _ => Self::Plain,
        }
    }

    /// Returns the number of reply words to request.
    pub fn reply_words(self) -> usize {
        match self {
            Self::Retired => 0,
            Self::StatusPrefixed => 8,
            Self::Plain => 4,
        }
    }
}

fn is_name_query(qid: u32) -> bool {
    matches!(
        QueryId::try_from(qid),
        Ok(QueryId::ClockGetName | QueryId::PinctrlGetFunctionName)
    )
}

/// Removes the status word a version 2 name query puts before its data, shifting the rest of
/// `data` down by one. Returns the removed status.
pub fn strip_status_word(data: &mut [u32]) -> u32 {
    let status = data[0];
    data.copy_within(1.., 0);
    status
}
