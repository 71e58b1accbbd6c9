use crate::constant::CommandByte;
use crate::protocol::primitive::write_int_1;

/// Write a command that consists of its command byte only, such as `COM_PING` or `COM_QUIT`
pub fn write_bare_command(out: &mut Vec<u8>, command: CommandByte) {
    write_int_1(out, command as u8);
}
