// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Conversions from HTTP message parts into HAR structures.

pub mod cookie;
pub mod headers;
pub mod uri;
