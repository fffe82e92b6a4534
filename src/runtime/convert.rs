/// JSON ⇄ Lua value bridging
///
/// Event batches and invocation contexts travel into handlers as Lua tables;
/// handler results and error values travel back out as JSON. Arrays are
/// detected the Lua way: contiguous positive integer keys 1..=n.

use mlua::{Lua, Value as LuaValue};
use serde_json::{json, Value};

/// Convert a JSON value into a Lua value owned by the given state
///
/// JSON `null` maps to Lua `nil` so handlers can use ordinary truthiness
/// checks on absent fields.
pub fn json_to_lua(lua: &Lua, value: &Value) -> mlua::Result<LuaValue> {
    match value {
        Value::Null => Ok(LuaValue::Nil),
        Value::Bool(flag) => Ok(LuaValue::Boolean(*flag)),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                Ok(LuaValue::Integer(integer))
            } else {
                Ok(LuaValue::Number(number.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Value::String(text) => Ok(LuaValue::String(lua.create_string(text)?)),
        Value::Array(items) => {
            let table = lua.create_table_with_capacity(items.len(), 0)?;
            for (index, item) in items.iter().enumerate() {
                table.set(index + 1, json_to_lua(lua, item)?)?;
            }
            Ok(LuaValue::Table(table))
        }
        Value::Object(entries) => {
            let table = lua.create_table_with_capacity(0, entries.len())?;
            for (key, item) in entries {
                table.set(key.as_str(), json_to_lua(lua, item)?)?;
            }
            Ok(LuaValue::Table(table))
        }
    }
}

/// Convert a Lua value into JSON
///
/// Tables with contiguous integer keys become arrays, everything else becomes
/// an object. Unsupported Lua types (functions, userdata, threads) become
/// null.
pub fn lua_to_json(value: &LuaValue) -> mlua::Result<Value> {
    match value {
        LuaValue::Nil => Ok(Value::Null),
        LuaValue::Boolean(flag) => Ok(Value::Bool(*flag)),
        LuaValue::Integer(integer) => Ok(json!(*integer)),
        LuaValue::Number(number) => Ok(serde_json::Number::from_f64(*number)
            .map(Value::Number)
            .unwrap_or(Value::Null)),
        LuaValue::String(text) => Ok(Value::String(text.to_str()?.to_string())),
        LuaValue::Table(table) => {
            // Check if it's an array or object
            let mut is_array = true;
            let mut max_index = 0usize;
            let mut count = 0usize;

            for pair in table.pairs::<LuaValue, LuaValue>() {
                let (key, _) = pair?;
                count += 1;

                match key {
                    LuaValue::Integer(index) if index > 0 => {
                        max_index = max_index.max(index as usize);
                    }
                    _ => {
                        is_array = false;
                        break;
                    }
                }
            }

            if is_array && count > 0 && count == max_index {
                let mut items = Vec::with_capacity(count);
                for index in 1..=max_index {
                    let item: LuaValue = table.get(index)?;
                    items.push(lua_to_json(&item)?);
                }
                Ok(Value::Array(items))
            } else {
                let mut entries = serde_json::Map::new();
                for pair in table.pairs::<LuaValue, LuaValue>() {
                    let (key, item) = pair?;
                    let key = match key {
                        LuaValue::String(text) => text.to_str()?.to_string(),
                        LuaValue::Integer(index) => index.to_string(),
                        LuaValue::Number(number) => number.to_string(),
                        _ => continue, // Skip unsupported key types
                    };
                    entries.insert(key, lua_to_json(&item)?);
                }
                Ok(Value::Object(entries))
            }
        }
        _ => Ok(Value::Null), // Unsupported types become null
    }
}
