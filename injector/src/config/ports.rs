// Copyright (c) 2025 Elektrobit Automotive GmbH
//
// This program and the accompanying materials are made available under the
// terms of the Apache License, Version 2.0 which is available at
// https://www.apache.org/licenses/LICENSE-2.0.
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations
// under the License.
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

const PORT_LIST_SEPARATOR: char = ',';
const PORT_RANGE_SEPARATOR: char = '-';

pub fn parse_port(value: &str) -> Result<u16, String> {
    match value.trim().parse::<u16>() {
        Ok(0) => Err("port 0 is not allowed".to_string()),
        Ok(port) => Ok(port),
        Err(_) => Err(format!("'{}' is not a port between 1 and 65535", value.trim())),
    }
}

/// An inclusive port range; a single port is a range with equal bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    pub fn single(port: u16) -> Self {
        PortRange {
            start: port,
            end: port,
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        self.start <= port && port <= self.end
    }
}

impl FromStr for PortRange {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once(PORT_RANGE_SEPARATOR) {
            Some((start, end)) => {
                let start = parse_port(start)?;
                let end = parse_port(end)?;
                if start > end {
                    return Err(format!(
                        "range '{start}-{end}' has its lower bound above its upper bound"
                    ));
                }
                Ok(PortRange { start, end })
            }
            None => Ok(PortRange::single(parse_port(value)?)),
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}{PORT_RANGE_SEPARATOR}{}", self.start, self.end)
        }
    }
}

/// A normalized list of ports and port ranges.
///
/// Entries are kept sorted and free of duplicates so the rendered form does not depend
/// on the order the ports were given in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PortList {
    ranges: Vec<PortRange>,
}

impl PortList {
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, port: u16) -> bool {
        self.ranges.iter().any(|range| range.contains(port))
    }

    /// Returns a new list containing the entries of both lists.
    pub fn union(&self, other: &PortList) -> PortList {
        self.ranges.iter().chain(other.ranges.iter()).copied().collect()
    }
}

impl FromIterator<PortRange> for PortList {
    fn from_iter<I: IntoIterator<Item = PortRange>>(iter: I) -> Self {
        let mut ranges: Vec<PortRange> = iter.into_iter().collect();
        ranges.sort();
        ranges.dedup();
        PortList { ranges }
    }
}

impl FromIterator<u16> for PortList {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        iter.into_iter().map(PortRange::single).collect()
    }
}

impl FromStr for PortList {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .split(PORT_LIST_SEPARATOR)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(PortRange::from_str)
            .collect::<Result<PortList, String>>()
    }
}

impl fmt::Display for PortList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.ranges.iter().map(PortRange::to_string).collect();
        write!(f, "{}", rendered.join(&PORT_LIST_SEPARATOR.to_string()))
    }
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{PortList, PortRange, parse_port};

    #[test]
    fn utest_port_list_is_order_independent() {
        let first: PortList = "345,234".parse().unwrap();
        let second: PortList = "234,345".parse().unwrap();

        assert_eq!(first, second);
        assert_eq!(first.to_string(), "234,345");
    }

    #[test]
    fn utest_port_list_removes_duplicates_and_whitespace() {
        let list: PortList = " 80, 443 ,80,,".parse().unwrap();

        assert_eq!(list.to_string(), "80,443");
    }

    #[test]
    fn utest_port_list_with_ranges() {
        let list: PortList = "9000-9100,25,8080".parse().unwrap();

        assert_eq!(list.to_string(), "25,8080,9000-9100");
        assert!(list.contains(9050));
        assert!(!list.contains(9101));
    }

    #[test]
    fn utest_port_list_empty() {
        let list: PortList = "".parse().unwrap();

        assert!(list.is_empty());
        assert_eq!(list.to_string(), "");
    }

    #[test]
    fn utest_port_list_rejects_malformed_entries() {
        assert!("80,http".parse::<PortList>().is_err());
        assert!("70000".parse::<PortList>().is_err());
        assert!("200-100".parse::<PortList>().is_err());
        assert!("0".parse::<PortList>().is_err());
    }

    #[test]
    fn utest_port_list_union_is_normalized() {
        let skip: PortList = "8080,25".parse().unwrap();
        let reserved: PortList = [4191u16, 4190].into_iter().collect();

        assert_eq!(reserved.union(&skip).to_string(), "25,4190,4191,8080");
    }

    #[test]
    fn utest_port_range_display() {
        assert_eq!(PortRange::single(22).to_string(), "22");
        assert_eq!("1-5".parse::<PortRange>().unwrap().to_string(), "1-5");
    }

    #[test]
    fn utest_parse_port() {
        assert_eq!(parse_port(" 4143 "), Ok(4143));
        assert!(parse_port("-1").is_err());
    }
}
