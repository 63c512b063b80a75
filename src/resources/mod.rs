/**
 * This module contains the logic for creating GPU resources from mesh data.
 */
pub mod geometry;
