use glob::glob;
use std::{
    fs::{self, File},
    io::{Error, ErrorKind, Read, Write},
    path::Path,
};

use crate::*;


/// Produce list of absolute paths matching given glob pattern, sorted:
pub fn produce_list_absolute(glob_pattern: &str) -> Result<Vec<String>, Error> {
    let entries =
        glob(glob_pattern).map_err(|err| Error::new(ErrorKind::InvalidInput, err.to_string()))?;
    let mut list = entries
        .filter_map(|entry| {
            match entry {
                Ok(path) => path.to_str().map(String::from),
                Err(err) => {
                    error!("produce_list_absolute(): {}", err);
                    None
                }
            }
        })
        .collect::<Vec<String>>();
    list.sort();
    trace!("produce_list_absolute(): Elements: {:?}", list);
    Ok(list)
}


/// Read text file
pub fn read_text_file(name: &str) -> Result<String, Error> {
    let mut file = File::open(name)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}


/// Write text file atomically: write to a sibling temporary file, then rename
pub fn write_atomic(name: &str, contents: &str) -> Result<(), Error> {
    let path = Path::new(name);
    let temporary = path.with_extension("tmp");
    {
        let mut file = File::create(&temporary)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&temporary, path)
}


/// Trim and collapse whitespace runs into single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}
