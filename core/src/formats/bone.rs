//! Bone file writer
//!
//! One `b,<name>,<hx>,<hy>,<hz>,<tx>,<ty>,<tz>` line per deforming bone. Line
//! order is the bone list position that weight records refer to.

use std::io::{self, Write};

use super::BONE_HEADER;
use crate::export::BoneExport;

pub fn write_bone_file<W: Write>(w: &mut W, bones: &[BoneExport]) -> io::Result<()> {
    writeln!(w, "{}", BONE_HEADER)?;

    for bone in bones {
        writeln!(
            w,
            "b,{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            bone.name, bone.head.x, bone.head.y, bone.head.z, bone.tail.x, bone.tail.y, bone.tail.z
        )?;
    }

    Ok(())
}
